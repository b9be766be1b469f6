//! Payment records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::PaymentId;

/// Which kind of sale a payment settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleType {
    LocalSale,
    WebOrder,
}

impl SaleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleType::LocalSale => "LOCAL_SALE",
            SaleType::WebOrder => "WEB_ORDER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "LOCAL_SALE" => Some(SaleType::LocalSale),
            "WEB_ORDER" => Some(SaleType::WebOrder),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Cash,
    Debit,
    Credit,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Debit => "DEBIT",
            PaymentMethod::Credit => "CREDIT",
            PaymentMethod::Transfer => "TRANSFER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CASH" => Some(PaymentMethod::Cash),
            "DEBIT" => Some(PaymentMethod::Debit),
            "CREDIT" => Some(PaymentMethod::Credit),
            "TRANSFER" => Some(PaymentMethod::Transfer),
            _ => None,
        }
    }
}

/// Flat payment record, linked to its sale by reference id only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub sale_type: SaleType,
    pub reference_id: Uuid,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}
