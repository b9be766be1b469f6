//! Inventory movement models
//!
//! Every row of the ledger stores a signed quantity: receipts are positive,
//! issues are negative and adjustments carry their own sign. Stock on hand is
//! the plain sum of that column.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::types::{MovementId, ProductId, UserId};

/// Ledger movement type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    In,
    Out,
    Adjust,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjust => "ADJUST",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "IN" => Some(MovementType::In),
            "OUT" => Some(MovementType::Out),
            "ADJUST" => Some(MovementType::Adjust),
            _ => None,
        }
    }
}

/// Why stock moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    /// Supplier delivery backed by a document
    Purchase,
    /// In-store sale or delivered web order
    Sale,
    /// Manual correction after a stock count
    Adjustment,
    /// Theft or unexplained loss
    Shrinkage,
    Damage,
    Expiry,
    /// Customer return put back on the shelf
    Return,
}

impl MovementReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementReason::Purchase => "purchase",
            MovementReason::Sale => "sale",
            MovementReason::Adjustment => "adjustment",
            MovementReason::Shrinkage => "shrinkage",
            MovementReason::Damage => "damage",
            MovementReason::Expiry => "expiry",
            MovementReason::Return => "return",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(MovementReason::Purchase),
            "sale" => Some(MovementReason::Sale),
            "adjustment" => Some(MovementReason::Adjustment),
            "shrinkage" => Some(MovementReason::Shrinkage),
            "damage" => Some(MovementReason::Damage),
            "expiry" => Some(MovementReason::Expiry),
            "return" => Some(MovementReason::Return),
            _ => None,
        }
    }

    /// Reasons owned by the purchase and sale flows; manual adjustments may not use them
    pub fn is_automatic(&self) -> bool {
        matches!(self, MovementReason::Purchase | MovementReason::Sale)
    }
}

/// A quantity change as requested by a caller
///
/// `In` and `Out` carry a magnitude, `Adjust` a signed delta. The ledger turns
/// all three into the same signed representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDelta {
    In(u32),
    Out(u32),
    Adjust(i32),
}

impl StockDelta {
    pub fn movement_type(&self) -> MovementType {
        match self {
            StockDelta::In(_) => MovementType::In,
            StockDelta::Out(_) => MovementType::Out,
            StockDelta::Adjust(_) => MovementType::Adjust,
        }
    }

    /// Signed value stored in the ledger row
    pub fn signed(&self) -> DomainResult<i32> {
        let value = match *self {
            StockDelta::In(q) => i32::try_from(q).ok().filter(|q| *q > 0),
            StockDelta::Out(q) => i32::try_from(q).ok().filter(|q| *q > 0).map(|q| -q),
            StockDelta::Adjust(d) => Some(d).filter(|d| *d != 0),
        };
        value.ok_or_else(|| {
            DomainError::validation("quantity", "Movement quantity must be non-zero and fit the ledger range")
        })
    }
}

/// Optional supporting document (supplier invoice, dispatch guide...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_type: String,
    pub document_number: String,
}

/// Movement to be appended to the ledger
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: ProductId,
    pub delta: StockDelta,
    pub reason: MovementReason,
    pub actor_id: UserId,
    pub document: Option<DocumentRef>,
    pub notes: Option<String>,
}

/// A committed ledger entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub movement_type: MovementType,
    pub reason: MovementReason,
    /// Signed contribution to stock on hand
    pub quantity: i32,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub notes: Option<String>,
    pub actor_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    /// Unsigned size of the movement
    pub fn magnitude(&self) -> u32 {
        self.quantity.unsigned_abs()
    }
}

/// Stock on hand derived from a sequence of movements
pub fn stock_on_hand<'a>(movements: impl IntoIterator<Item = &'a Movement>) -> i64 {
    movements.into_iter().map(|m| i64::from(m.quantity)).sum()
}
