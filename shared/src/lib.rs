//! Shared types and domain rules for the Minimarket stock core
//!
//! This crate holds everything that can be decided without touching the
//! database: identifiers, models, the stock arithmetic, the reservation and
//! web order transition tables and input validation.

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
