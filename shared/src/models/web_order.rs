//! Web order models and the order status state machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::models::order_line::PricedLine;
use crate::types::WebOrderId;

/// Web order status
///
/// `REQUESTED` is accepted as a synonym of `PENDING` when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebOrderStatus {
    #[serde(alias = "REQUESTED")]
    Pending,
    Reserved,
    Paid,
    Prepared,
    Delivered,
    Cancelled,
}

/// Side effect attached to a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    /// Turn active reservations into OUT movements
    ConsumeReservations,
    /// Free active reservations, ledger untouched
    ReleaseReservations,
    /// Status field only
    None,
}

impl WebOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebOrderStatus::Pending => "PENDING",
            WebOrderStatus::Reserved => "RESERVED",
            WebOrderStatus::Paid => "PAID",
            WebOrderStatus::Prepared => "PREPARED",
            WebOrderStatus::Delivered => "DELIVERED",
            WebOrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" | "REQUESTED" => Some(WebOrderStatus::Pending),
            "RESERVED" => Some(WebOrderStatus::Reserved),
            "PAID" => Some(WebOrderStatus::Paid),
            "PREPARED" => Some(WebOrderStatus::Prepared),
            "DELIVERED" => Some(WebOrderStatus::Delivered),
            "CANCELLED" => Some(WebOrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WebOrderStatus::Delivered | WebOrderStatus::Cancelled)
    }

    /// Validate a move to `target` and report which side effect it carries
    ///
    /// Only DELIVERED and CANCELLED orders are locked. Between open statuses
    /// any move, including a repeat of the current one, just updates the
    /// status field.
    pub fn transition_to(&self, target: WebOrderStatus) -> DomainResult<TransitionEffect> {
        if self.is_terminal() {
            return Err(DomainError::InvalidStateTransition(format!(
                "order is already {} and cannot change status",
                self.as_str()
            )));
        }

        Ok(match target {
            WebOrderStatus::Delivered => TransitionEffect::ConsumeReservations,
            WebOrderStatus::Cancelled => TransitionEffect::ReleaseReservations,
            _ => TransitionEffect::None,
        })
    }
}

/// Customer contact captured with the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

/// A web order with its priced items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebOrder {
    pub id: WebOrderId,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub status: WebOrderStatus,
    pub total_amount: Decimal,
    pub items: Vec<PricedLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
