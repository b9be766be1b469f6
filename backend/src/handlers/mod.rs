//! HTTP handlers

mod health;
mod inventory;
mod local_sales;
mod web_orders;

pub use health::*;
pub use inventory::*;
pub use local_sales::*;
pub use web_orders::*;

const DEFAULT_PAGE_LIMIT: i64 = 50;
const MAX_PAGE_LIMIT: i64 = 200;

/// Clamp a requested list size
pub(crate) fn page_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT)
}
