//! HTTP handlers for web order endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{CustomerInfo, LineRequest, Reservation, UserId, WebOrder, WebOrderId, WebOrderStatus};
use validator::Validate;

use super::page_limit;
use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::AppState;

/// Customer facing order request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateWebOrderRequest {
    #[validate(length(min = 1, max = 255))]
    pub customer_name: String,
    #[validate(length(min = 1, max = 32))]
    pub customer_phone: String,
    #[validate(length(max = 255))]
    pub customer_email: Option<String>,
    pub items: Vec<LineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ListWebOrdersQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: WebOrderStatus,
    /// Defaults to the authenticated user
    pub actor_id: Option<UserId>,
}

/// Place a web order (public)
pub async fn create_web_order(
    State(state): State<AppState>,
    Json(request): Json<CreateWebOrderRequest>,
) -> AppResult<(StatusCode, Json<WebOrder>)> {
    request.validate()?;

    let customer = CustomerInfo {
        name: request.customer_name,
        phone: request.customer_phone,
        email: request.customer_email,
    };
    let order = state
        .web_order_service()
        .create_web_order(customer, request.items)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List web orders, optionally filtered by status
pub async fn list_web_orders(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<ListWebOrdersQuery>,
) -> AppResult<Json<Vec<WebOrder>>> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(WebOrderStatus::from_str(&raw.to_uppercase()).ok_or_else(|| {
            AppError::Validation {
                field: "status".to_string(),
                message: format!("Unknown web order status '{}'", raw),
            }
        })?),
        None => None,
    };

    let orders = state
        .web_order_service()
        .list_web_orders(status, page_limit(query.limit))
        .await?;
    Ok(Json(orders))
}

/// Get a web order with its items
pub async fn get_web_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<WebOrderId>,
) -> AppResult<Json<WebOrder>> {
    let order = state.web_order_service().get_web_order(order_id).await?;
    Ok(Json(order))
}

/// Get the reservations of a web order
pub async fn get_web_order_reservations(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(order_id): Path<WebOrderId>,
) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = state.web_order_service().get_reservations(order_id).await?;
    Ok(Json(reservations))
}

/// Move a web order to a new status
pub async fn update_web_order_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<WebOrderId>,
    Json(request): Json<UpdateStatusRequest>,
) -> AppResult<Json<WebOrder>> {
    let actor_id = request.actor_id.unwrap_or(current_user.0.user_id);
    let order = state
        .web_order_service()
        .update_status(order_id, request.status, Some(actor_id))
        .await?;
    Ok(Json(order))
}
