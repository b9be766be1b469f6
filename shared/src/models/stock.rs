//! Derived stock figures and the availability rules built on them

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::types::ProductId;

/// Stock position of one product, read inside a single snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub stock_on_hand: i64,
    pub reserved: i64,
}

impl StockLevel {
    pub fn new(product_id: ProductId, stock_on_hand: i64, reserved: i64) -> Self {
        Self {
            product_id,
            stock_on_hand,
            reserved,
        }
    }

    /// Quantity that can still be sold or reserved
    pub fn available(&self) -> i64 {
        self.stock_on_hand - self.reserved
    }

    fn insufficient(&self, requested: i64, available: i64) -> DomainError {
        DomainError::InsufficientStock {
            product_id: self.product_id,
            product_name: None,
            requested,
            available,
        }
    }

    /// Check that `requested` units can be taken from available stock
    pub fn ensure_available(&self, requested: i64) -> DomainResult<()> {
        if requested > self.available() {
            return Err(self.insufficient(requested, self.available()));
        }
        Ok(())
    }

    /// Stock on hand after applying a manual adjustment
    ///
    /// The result may not go below zero, nor below what active reservations
    /// already hold, otherwise available stock would turn negative.
    pub fn project_adjustment(&self, delta: i64) -> DomainResult<i64> {
        let projected = self.stock_on_hand + delta;
        if projected < 0 || projected < self.reserved {
            return Err(self.insufficient(-delta, self.available()));
        }
        Ok(projected)
    }

    /// Check that a reservation of `quantity` can be turned into an issue
    pub fn ensure_can_consume(&self, quantity: i64) -> DomainResult<()> {
        if self.stock_on_hand - quantity < 0 {
            return Err(self.insufficient(quantity, self.stock_on_hand));
        }
        Ok(())
    }
}

/// A projection row that no longer matches the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDrift {
    pub product_id: ProductId,
    pub projected: i64,
    pub ledger: i64,
}

impl StockDrift {
    pub fn difference(&self) -> i64 {
        self.ledger - self.projected
    }
}
