//! Line items shared by in-store sales and web orders

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Requested line: product and quantity, no price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Line with the unit price captured when the sale or order was taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl PricedLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Sum of line totals
pub fn lines_total<'a>(lines: impl IntoIterator<Item = &'a PricedLine>) -> Decimal {
    lines.into_iter().map(PricedLine::line_total).sum()
}

/// Total requested quantity per product, ordered by product id
///
/// Lines naming the same product are checked against stock together, and the
/// ordering doubles as the row lock order.
pub fn demand_by_product(lines: &[LineRequest]) -> BTreeMap<ProductId, i64> {
    let mut demand = BTreeMap::new();
    for line in lines {
        *demand.entry(line.product_id).or_insert(0) += i64::from(line.quantity);
    }
    demand
}
