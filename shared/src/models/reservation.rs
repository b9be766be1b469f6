//! Stock reservation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::types::{ProductId, ReservationId, WebOrderId};

/// Reservation lifecycle. `Consumed` and `Released` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReservationStatus {
    Active,
    Consumed,
    Released,
}

/// Outcome of asking a reservation to move to a terminal status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationTransition {
    /// Status changes and must be persisted
    Apply,
    /// Already in the requested status
    NoOp,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Active => "ACTIVE",
            ReservationStatus::Consumed => "CONSUMED",
            ReservationStatus::Released => "RELEASED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(ReservationStatus::Active),
            "CONSUMED" => Some(ReservationStatus::Consumed),
            "RELEASED" => Some(ReservationStatus::Released),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Active)
    }

    /// Decide whether moving to `target` is allowed
    ///
    /// Repeating the same terminal transition is a no-op. Crossing from one
    /// terminal status to the other, or going back to `Active`, is rejected.
    pub fn transition_to(&self, target: ReservationStatus) -> DomainResult<ReservationTransition> {
        match (self, target) {
            (_, ReservationStatus::Active) => Err(DomainError::InvalidStateTransition(format!(
                "reservation cannot return to ACTIVE from {}",
                self.as_str()
            ))),
            (ReservationStatus::Active, _) => Ok(ReservationTransition::Apply),
            (current, target) if *current == target => Ok(ReservationTransition::NoOp),
            (current, target) => Err(DomainError::InvalidStateTransition(format!(
                "reservation is already {} and cannot become {}",
                current.as_str(),
                target.as_str()
            ))),
        }
    }
}

/// A hold on stock for one web order line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub product_id: ProductId,
    pub web_order_id: WebOrderId,
    pub quantity: i32,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Move this reservation to `target`, returning whether anything changed
    pub fn transition(&mut self, target: ReservationStatus) -> DomainResult<ReservationTransition> {
        let outcome = self.status.transition_to(target)?;
        if outcome == ReservationTransition::Apply {
            self.status = target;
        }
        Ok(outcome)
    }
}
