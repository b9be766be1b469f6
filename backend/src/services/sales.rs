//! Local (point of sale) sale coordinator
//!
//! A local sale checks availability, snapshots prices, persists the sale,
//! deducts stock and records the payment in a single transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    lines_total, validate_lines, LineRequest, LocalSale, LocalSaleId, MovementReason,
    NewMovement, Payment, PaymentMethod, PricedLine, SaleStatus, SaleType, StockDelta, UserId,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::stock::StockService;
use super::{catalog, ledger, payments};
use crate::db::{self, TxSettings};
use crate::error::{AppError, AppResult};

/// Local sale service
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
    tx_settings: TxSettings,
}

/// Input for creating a local sale
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLocalSaleInput {
    pub items: Vec<LineRequest>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, FromRow)]
struct LocalSaleRow {
    id: Uuid,
    actor_id: Uuid,
    total_amount: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
}

impl From<SaleItemRow> for PricedLine {
    fn from(row: SaleItemRow) -> Self {
        PricedLine {
            product_id: row.product_id.into(),
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool, tx_settings: TxSettings) -> Self {
        Self { db, tx_settings }
    }

    /// Complete a local sale. Either every line is sold or nothing is.
    pub async fn create_local_sale(
        &self,
        actor_id: UserId,
        input: CreateLocalSaleInput,
    ) -> AppResult<LocalSale> {
        validate_lines(&input.items)?;

        let mut tx = db::begin_write(&self.db, self.tx_settings).await?;
        catalog::ensure_user_exists(&mut tx, actor_id).await?;

        let products = StockService::lock_and_check(&mut tx, &input.items).await?;

        let mut lines = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let product = products
                .get(&item.product_id)
                .ok_or_else(|| AppError::not_found("Product", item.product_id))?;
            lines.push(PricedLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: product.price,
            });
        }
        let total_amount = lines_total(&lines);

        let sale = sqlx::query_as::<_, LocalSaleRow>(
            r#"
            INSERT INTO local_sales (actor_id, total_amount, status)
            VALUES ($1, $2, $3)
            RETURNING id, actor_id, total_amount, status, created_at
            "#,
        )
        .bind(actor_id.as_uuid())
        .bind(total_amount)
        .bind(SaleStatus::Completed.as_str())
        .fetch_one(&mut *tx)
        .await?;
        let sale_id = LocalSaleId::from(sale.id);

        for (line_no, line) in lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO local_sale_items (local_sale_id, line_no, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(sale.id)
            .bind(line_no as i32)
            .bind(line.product_id.as_uuid())
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        for line in &lines {
            ledger::append(
                &mut tx,
                NewMovement {
                    product_id: line.product_id,
                    delta: StockDelta::Out(line.quantity.unsigned_abs()),
                    reason: MovementReason::Sale,
                    actor_id,
                    document: None,
                    notes: Some(format!("Local sale: {}", sale_id)),
                },
            )
            .await?;
        }

        payments::record(
            &mut tx,
            SaleType::LocalSale,
            sale.id,
            input.payment_method,
            total_amount,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            sale_id = %sale_id,
            actor_id = %actor_id,
            items = lines.len(),
            total = %total_amount,
            "Local sale completed"
        );

        to_local_sale(sale, lines)
    }

    /// Get a local sale with its items
    pub async fn get_local_sale(&self, sale_id: LocalSaleId) -> AppResult<LocalSale> {
        let mut conn = self.db.acquire().await?;

        let sale = sqlx::query_as::<_, LocalSaleRow>(
            r#"
            SELECT id, actor_id, total_amount, status, created_at
            FROM local_sales
            WHERE id = $1
            "#,
        )
        .bind(sale_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Local sale", sale_id))?;

        let items = load_items(&mut conn, sale.id).await?;
        to_local_sale(sale, items)
    }

    /// List local sales, newest first
    pub async fn list_local_sales(&self, limit: i64) -> AppResult<Vec<LocalSale>> {
        let mut conn = self.db.acquire().await?;

        let rows = sqlx::query_as::<_, LocalSaleRow>(
            r#"
            SELECT id, actor_id, total_amount, status, created_at
            FROM local_sales
            ORDER BY created_at DESC, id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        let mut sales = Vec::with_capacity(rows.len());
        for row in rows {
            let items = load_items(&mut conn, row.id).await?;
            sales.push(to_local_sale(row, items)?);
        }
        Ok(sales)
    }

    /// Payments recorded for a local sale
    pub async fn get_payments(&self, sale_id: LocalSaleId) -> AppResult<Vec<Payment>> {
        let mut conn = self.db.acquire().await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM local_sales WHERE id = $1)",
        )
        .bind(sale_id.as_uuid())
        .fetch_one(&mut *conn)
        .await?;
        if !exists {
            return Err(AppError::not_found("Local sale", sale_id));
        }

        payments::for_reference(&mut conn, SaleType::LocalSale, sale_id.as_uuid()).await
    }
}

async fn load_items(conn: &mut PgConnection, sale_id: Uuid) -> AppResult<Vec<PricedLine>> {
    let rows = sqlx::query_as::<_, SaleItemRow>(
        r#"
        SELECT product_id, quantity, unit_price
        FROM local_sale_items
        WHERE local_sale_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(PricedLine::from).collect())
}

fn to_local_sale(row: LocalSaleRow, items: Vec<PricedLine>) -> AppResult<LocalSale> {
    let status = SaleStatus::from_str(&row.status)
        .ok_or_else(|| AppError::Internal(format!("unknown sale status '{}'", row.status)))?;

    Ok(LocalSale {
        id: row.id.into(),
        actor_id: row.actor_id.into(),
        total_amount: row.total_amount,
        status,
        items,
        created_at: row.created_at,
    })
}
