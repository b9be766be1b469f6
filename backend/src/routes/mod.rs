//! Route definitions for the Minimarket stock API

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Web orders - placement is public, management is protected
        .nest("/web-orders", web_order_routes(state.clone()))
        // Protected routes - inventory
        .nest("/inventory", inventory_routes(state.clone()))
        // Protected routes - point of sale
        .nest("/local-sales", local_sale_routes(state))
}

/// Inventory routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/purchases", post(handlers::register_purchase))
        .route("/adjustments", post(handlers::register_adjustment))
        .route("/reconcile", post(handlers::reconcile_stock))
        .route("/:product_id/stock", get(handlers::get_stock))
        .route("/:product_id/movements", get(handlers::get_movements))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Local sale routes (protected)
fn local_sale_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_local_sales).post(handlers::create_local_sale),
        )
        .route("/:id", get(handlers::get_local_sale))
        .route("/:id/payments", get(handlers::get_local_sale_payments))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Web order routes
///
/// `route_layer` only wraps routes registered before it, so the customer
/// facing `POST /` added afterwards stays public.
fn web_order_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_web_orders))
        .route("/:id", get(handlers::get_web_order))
        .route("/:id/status", patch(handlers::update_web_order_status))
        .route("/:id/reservations", get(handlers::get_web_order_reservations))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
        .route("/", post(handlers::create_web_order))
}
