//! In-store sale models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::order_line::PricedLine;
use crate::types::{LocalSaleId, UserId};

/// In-store sales complete immediately; there is no pending phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SaleStatus {
    Completed,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "COMPLETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "COMPLETED" => Some(SaleStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSale {
    pub id: LocalSaleId,
    pub actor_id: UserId,
    pub total_amount: Decimal,
    pub status: SaleStatus,
    pub items: Vec<PricedLine>,
    pub created_at: DateTime<Utc>,
}
