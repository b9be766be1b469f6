//! Helpers shared by the database backed tests
//!
//! Database tests run against `DATABASE_URL` and are skipped when it is not
//! set. Every test creates its own users and products, so tests can share one
//! database and run in parallel.

#![allow(dead_code)]

use rust_decimal::Decimal;
use shared::{CustomerInfo, LineRequest, ProductId, UserId};
use sqlx::{postgres::PgPoolOptions, PgPool};
use stock_backend::services::stock::RegisterPurchaseInput;
use stock_backend::{SaleService, StockService, TxSettings, WebOrderService};
use uuid::Uuid;

/// Connect to `DATABASE_URL` and apply migrations, or `None` to skip
pub async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set, skipping database test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(16)
        .connect(&url)
        .await
        .expect("connect to DATABASE_URL");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("apply migrations");

    Some(pool)
}

pub struct Services {
    pub stock: StockService,
    pub sales: SaleService,
    pub orders: WebOrderService,
}

pub fn services(pool: &PgPool) -> Services {
    let settings = TxSettings::default();
    Services {
        stock: StockService::new(pool.clone(), settings),
        sales: SaleService::new(pool.clone(), settings),
        orders: WebOrderService::new(pool.clone(), settings, None),
    }
}

pub async fn create_user(pool: &PgPool) -> UserId {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, full_name, role) VALUES ($1, $2, 'cashier') RETURNING id",
    )
    .bind(format!("{}@test.local", Uuid::new_v4()))
    .bind("Test Cashier")
    .fetch_one(pool)
    .await
    .expect("insert user");
    UserId::from(id)
}

pub async fn create_product(pool: &PgPool, name: &str, price: i64) -> ProductId {
    let id: Uuid =
        sqlx::query_scalar("INSERT INTO products (name, price) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(Decimal::from(price))
            .fetch_one(pool)
            .await
            .expect("insert product");
    ProductId::from(id)
}

/// Create a product and receive `quantity` units of it
pub async fn stocked_product(
    pool: &PgPool,
    stock: &StockService,
    actor: UserId,
    name: &str,
    price: i64,
    quantity: i32,
) -> ProductId {
    let product_id = create_product(pool, name, price).await;
    stock
        .register_purchase(actor, purchase(product_id, quantity))
        .await
        .expect("initial purchase");
    product_id
}

pub fn purchase(product_id: ProductId, quantity: i32) -> RegisterPurchaseInput {
    RegisterPurchaseInput {
        product_id,
        quantity,
        document_type: Some("FACTURA".to_string()),
        document_number: Some("F-1".to_string()),
        notes: None,
    }
}

pub fn line(product_id: ProductId, quantity: i32) -> LineRequest {
    LineRequest {
        product_id,
        quantity,
    }
}

pub fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Cliente Web".to_string(),
        phone: "+56900000000".to_string(),
        email: Some("cliente@minimarket.cl".to_string()),
    }
}

pub async fn movement_count(pool: &PgPool, product_id: ProductId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM inventory_movements WHERE product_id = $1")
        .bind(product_id.as_uuid())
        .fetch_one(pool)
        .await
        .expect("count movements")
}
