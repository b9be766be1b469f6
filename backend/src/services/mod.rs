//! Business logic services for the Minimarket stock core
//!
//! `catalog`, `ledger`, `reservations` and `payments` are primitives that run
//! inside a caller's transaction. The service structs own the transactions.

pub mod catalog;
pub mod ledger;
pub mod payments;
pub mod reservations;
pub mod sales;
pub mod stock;
pub mod web_orders;

pub use sales::SaleService;
pub use stock::StockService;
pub use web_orders::WebOrderService;
