//! Product and user lookups used inside stock transactions

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use shared::{ProductId, UserId};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Product row as seen by the stock core
#[derive(Debug, Clone, FromRow)]
pub struct ProductRecord {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

impl ProductRecord {
    pub fn product_id(&self) -> ProductId {
        ProductId::from(self.id)
    }
}

/// Lock the given product rows with `FOR UPDATE` in ascending id order.
///
/// Every stock write goes through here before reading ledger or reservation
/// totals, so two transactions touching the same product are serialized and
/// always acquire their locks in the same order.
pub async fn lock_products(
    conn: &mut PgConnection,
    product_ids: impl IntoIterator<Item = ProductId>,
) -> AppResult<BTreeMap<ProductId, ProductRecord>> {
    let mut ids: Vec<Uuid> = product_ids.into_iter().map(Uuid::from).collect();
    ids.sort();
    ids.dedup();

    let rows = sqlx::query_as::<_, ProductRecord>(
        r#"
        SELECT id, name, price
        FROM products
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let locked: BTreeMap<ProductId, ProductRecord> = rows
        .into_iter()
        .map(|row| (row.product_id(), row))
        .collect();

    if let Some(missing) = ids
        .iter()
        .map(|id| ProductId::from(*id))
        .find(|id| !locked.contains_key(id))
    {
        return Err(AppError::not_found("Product", missing));
    }

    Ok(locked)
}

/// Fail with `NotFound` unless the product exists
pub async fn ensure_product_exists(conn: &mut PgConnection, product_id: ProductId) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
        .bind(product_id.as_uuid())
        .fetch_one(&mut *conn)
        .await?;

    if !exists {
        return Err(AppError::not_found("Product", product_id));
    }
    Ok(())
}

/// Fail with `NotFound` unless the user exists and is active
pub async fn ensure_user_exists(conn: &mut PgConnection, user_id: UserId) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND active = TRUE)",
    )
    .bind(user_id.as_uuid())
    .fetch_one(&mut *conn)
    .await?;

    if !exists {
        return Err(AppError::not_found("User", user_id));
    }
    Ok(())
}

/// Lock every product row in ascending id order
pub async fn lock_all_products(conn: &mut PgConnection) -> AppResult<()> {
    sqlx::query("SELECT id FROM products ORDER BY id FOR UPDATE")
        .execute(&mut *conn)
        .await?;
    Ok(())
}
