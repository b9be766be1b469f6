//! Minimarket Stock Core - Backend
//!
//! Inventory ledger, reservations, local sales and the web order state
//! machine, served over a small HTTP API.

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;
pub use db::TxSettings;
pub use services::{SaleService, StockService, WebOrderService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Timeouts applied to every write transaction
    pub fn tx_settings(&self) -> TxSettings {
        TxSettings::from_config(&self.config.database)
    }

    pub fn stock_service(&self) -> StockService {
        StockService::new(self.db.clone(), self.tx_settings())
    }

    pub fn sale_service(&self) -> SaleService {
        SaleService::new(self.db.clone(), self.tx_settings())
    }

    pub fn web_order_service(&self) -> WebOrderService {
        WebOrderService::new(
            self.db.clone(),
            self.tx_settings(),
            self.config.stock.reservation_ttl_minutes,
        )
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Minimarket Stock API v1.0"
}
