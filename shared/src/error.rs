//! Domain rule violations
//!
//! These are raised by the pure rules in this crate. The backend maps them onto
//! its application error, adding store-level failures (not found, timeouts,
//! conflicts) that only exist once a database is involved.

use thiserror::Error;

use crate::types::ProductId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        product_name: Option<String>,
        requested: i64,
        available: i64,
    },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Attach a product name to an `InsufficientStock` error, leaving other kinds untouched
    pub fn with_product_name(self, name: &str) -> Self {
        match self {
            DomainError::InsufficientStock {
                product_id,
                requested,
                available,
                ..
            } => DomainError::InsufficientStock {
                product_id,
                product_name: Some(name.to_string()),
                requested,
                available,
            },
            other => other,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
