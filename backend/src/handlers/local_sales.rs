//! HTTP handlers for local sale endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{LocalSale, LocalSaleId, Payment};

use super::page_limit;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::sales::CreateLocalSaleInput;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListLocalSalesQuery {
    pub limit: Option<i64>,
}

/// Complete a sale at the counter
pub async fn create_local_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateLocalSaleInput>,
) -> AppResult<(StatusCode, Json<LocalSale>)> {
    let sale = state
        .sale_service()
        .create_local_sale(current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// List local sales, newest first
pub async fn list_local_sales(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListLocalSalesQuery>,
) -> AppResult<Json<Vec<LocalSale>>> {
    let sales = state
        .sale_service()
        .list_local_sales(page_limit(query.limit))
        .await?;
    Ok(Json(sales))
}

/// Get a local sale with its items
pub async fn get_local_sale(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(sale_id): Path<LocalSaleId>,
) -> AppResult<Json<LocalSale>> {
    let sale = state.sale_service().get_local_sale(sale_id).await?;
    Ok(Json(sale))
}

/// Get the payments recorded for a local sale
pub async fn get_local_sale_payments(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(sale_id): Path<LocalSaleId>,
) -> AppResult<Json<Vec<Payment>>> {
    let payments = state.sale_service().get_payments(sale_id).await?;
    Ok(Json(payments))
}
