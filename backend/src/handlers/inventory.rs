//! HTTP handlers for inventory endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use shared::{Movement, ProductId, StockDrift, StockLevel};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::stock::{RegisterAdjustmentInput, RegisterPurchaseInput};
use crate::AppState;

/// Stock figures for one product, read from a single snapshot
#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub product_id: ProductId,
    pub stock_on_hand: i64,
    pub reserved: i64,
    pub available: i64,
}

impl From<StockLevel> for StockResponse {
    fn from(level: StockLevel) -> Self {
        Self {
            product_id: level.product_id,
            stock_on_hand: level.stock_on_hand,
            reserved: level.reserved,
            available: level.available(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReconcileRequest {
    pub product_id: Option<ProductId>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub repaired: usize,
    /// Units the projection was short (positive) or over (negative) in total
    pub net_difference: i64,
    pub drifts: Vec<StockDrift>,
}

impl ReconcileResponse {
    pub fn from_drifts(drifts: Vec<StockDrift>) -> Self {
        Self {
            repaired: drifts.len(),
            net_difference: drifts.iter().map(StockDrift::difference).sum(),
            drifts,
        }
    }
}

/// Register a supplier purchase
pub async fn register_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RegisterPurchaseInput>,
) -> AppResult<(StatusCode, Json<Movement>)> {
    let movement = state
        .stock_service()
        .register_purchase(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Register a manual stock adjustment
pub async fn register_adjustment(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RegisterAdjustmentInput>,
) -> AppResult<(StatusCode, Json<Movement>)> {
    let movement = state
        .stock_service()
        .register_adjustment(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Get stock on hand, reserved and available for a product
pub async fn get_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<ProductId>,
) -> AppResult<Json<StockResponse>> {
    let level = state.stock_service().get_stock_level(product_id).await?;
    Ok(Json(level.into()))
}

/// Get the movement history of a product, newest first
pub async fn get_movements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<ProductId>,
) -> AppResult<Json<Vec<Movement>>> {
    let movements = state.stock_service().get_movements(product_id).await?;
    Ok(Json(movements))
}

/// Rebuild the stock projection from the ledger
pub async fn reconcile_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ReconcileRequest>,
) -> AppResult<Json<ReconcileResponse>> {
    tracing::info!(user_id = %current_user.0.user_id, "Stock reconciliation requested");
    let drifts = state.stock_service().reconcile(request.product_id).await?;
    Ok(Json(ReconcileResponse::from_drifts(drifts)))
}
