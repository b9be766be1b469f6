//! Web order state machine
//!
//! Orders reserve stock when they are created. Delivery turns the
//! reservations into OUT movements and cancellation releases them.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use shared::{
    lines_total, validate_customer, validate_lines, CustomerInfo, LineRequest, MovementReason,
    NewMovement, PricedLine, Reservation, StockDelta, TransitionEffect, UserId, WebOrder,
    WebOrderId, WebOrderStatus,
};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::stock::{reject, StockService};
use super::{catalog, ledger, reservations};
use crate::db::{self, TxSettings};
use crate::error::{AppError, AppResult};

/// Web order service
#[derive(Clone)]
pub struct WebOrderService {
    db: PgPool,
    tx_settings: TxSettings,
    reservation_ttl: Option<Duration>,
}

#[derive(Debug, FromRow)]
struct WebOrderRow {
    id: Uuid,
    customer_name: String,
    customer_phone: String,
    customer_email: Option<String>,
    status: String,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
}

impl From<OrderItemRow> for PricedLine {
    fn from(row: OrderItemRow) -> Self {
        PricedLine {
            product_id: row.product_id.into(),
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

const ORDER_COLUMNS: &str =
    "id, customer_name, customer_phone, customer_email, status, total_amount, created_at, updated_at";

impl WebOrderService {
    /// Create a new WebOrderService instance
    pub fn new(db: PgPool, tx_settings: TxSettings, reservation_ttl_minutes: Option<i64>) -> Self {
        Self {
            db,
            tx_settings,
            reservation_ttl: reservation_ttl_minutes.map(Duration::minutes),
        }
    }

    /// Place a web order at PENDING and reserve stock for every item
    pub async fn create_web_order(
        &self,
        customer: CustomerInfo,
        items: Vec<LineRequest>,
    ) -> AppResult<WebOrder> {
        validate_customer(&customer.name, &customer.phone, customer.email.as_deref())?;
        validate_lines(&items)?;

        let customer_email = customer
            .email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty());

        let mut tx = db::begin_write(&self.db, self.tx_settings).await?;
        let products = StockService::lock_and_check(&mut tx, &items).await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in &items {
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

        let order = sqlx::query_as::<_, WebOrderRow>(&format!(
            r#"
            INSERT INTO web_orders (customer_name, customer_phone, customer_email, status, total_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(customer.name.trim())
        .bind(customer.phone.trim())
        .bind(&customer_email)
        .bind(WebOrderStatus::Pending.as_str())
        .bind(total_amount)
        .fetch_one(&mut *tx)
        .await?;
        let order_id = WebOrderId::from(order.id);

        for (line_no, line) in lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO web_order_items (web_order_id, line_no, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id)
            .bind(line_no as i32)
            .bind(line.product_id.as_uuid())
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        let expires_at = self.reservation_ttl.map(|ttl| Utc::now() + ttl);
        for line in &lines {
            reservations::reserve(&mut tx, line.product_id, order_id, line.quantity, expires_at)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            items = lines.len(),
            total = %total_amount,
            "Web order placed"
        );

        to_web_order(order, lines)
    }

    /// Move an order to a new status, applying the reservation side effects
    /// of delivery and cancellation.
    pub async fn update_status(
        &self,
        order_id: WebOrderId,
        new_status: WebOrderStatus,
        actor_id: Option<UserId>,
    ) -> AppResult<WebOrder> {
        let mut tx = db::begin_write(&self.db, self.tx_settings).await?;

        let current = sqlx::query_as::<_, WebOrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM web_orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Web order", order_id))?;
        let current_status = parse_status(&current.status)?;

        let effect = current_status.transition_to(new_status).map_err(|err| {
            tracing::warn!(order_id = %order_id, error = %err, "Web order transition rejected");
            AppError::from(err)
        })?;

        match effect {
            TransitionEffect::ConsumeReservations => {
                let actor_id = actor_id.ok_or_else(|| AppError::Validation {
                    field: "actor_id".to_string(),
                    message: "An actor is required to deliver an order".to_string(),
                })?;
                Self::deliver(&mut tx, order_id, actor_id).await?;
            }
            TransitionEffect::ReleaseReservations => {
                Self::cancel(&mut tx, order_id).await?;
            }
            TransitionEffect::None => {}
        }

        let order = sqlx::query_as::<_, WebOrderRow>(&format!(
            r#"
            UPDATE web_orders SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id.as_uuid())
        .bind(new_status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let items = load_items(&mut tx, order.id).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            from = current_status.as_str(),
            to = new_status.as_str(),
            "Web order status updated"
        );

        to_web_order(order, items)
    }

    async fn deliver(
        conn: &mut PgConnection,
        order_id: WebOrderId,
        actor_id: UserId,
    ) -> AppResult<()> {
        catalog::ensure_user_exists(conn, actor_id).await?;

        let mut active = reservations::active_for_order(conn, order_id).await?;
        let products =
            catalog::lock_products(conn, active.iter().map(|r| r.product_id)).await?;

        for reservation in &mut active {
            let product = products
                .get(&reservation.product_id)
                .ok_or_else(|| AppError::not_found("Product", reservation.product_id))?;

            let level = StockService::stock_level(conn, reservation.product_id).await?;
            level
                .ensure_can_consume(i64::from(reservation.quantity))
                .map_err(|err| reject(product, err))?;

            ledger::append(
                conn,
                NewMovement {
                    product_id: reservation.product_id,
                    delta: StockDelta::Out(reservation.quantity.unsigned_abs()),
                    reason: MovementReason::Sale,
                    actor_id,
                    document: None,
                    notes: Some(format!("Web order: {}", order_id)),
                },
            )
            .await?;
            reservations::consume(conn, reservation).await?;
        }

        Ok(())
    }

    async fn cancel(conn: &mut PgConnection, order_id: WebOrderId) -> AppResult<()> {
        let mut active = reservations::active_for_order(conn, order_id).await?;
        catalog::lock_products(conn, active.iter().map(|r| r.product_id)).await?;

        for reservation in &mut active {
            reservations::release(conn, reservation).await?;
        }
        Ok(())
    }

    /// Get a web order with its items
    pub async fn get_web_order(&self, order_id: WebOrderId) -> AppResult<WebOrder> {
        let mut conn = self.db.acquire().await?;

        let order = sqlx::query_as::<_, WebOrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM web_orders WHERE id = $1"
        ))
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Web order", order_id))?;

        let items = load_items(&mut conn, order.id).await?;
        to_web_order(order, items)
    }

    /// List web orders newest first, optionally filtered by status
    pub async fn list_web_orders(
        &self,
        status: Option<WebOrderStatus>,
        limit: i64,
    ) -> AppResult<Vec<WebOrder>> {
        let mut conn = self.db.acquire().await?;

        let rows = sqlx::query_as::<_, WebOrderRow>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM web_orders
            WHERE ($1::VARCHAR IS NULL OR status = $1)
            ORDER BY created_at DESC, id
            LIMIT $2
            "#
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = load_items(&mut conn, row.id).await?;
            orders.push(to_web_order(row, items)?);
        }
        Ok(orders)
    }

    /// Every reservation held or once held by an order
    pub async fn get_reservations(&self, order_id: WebOrderId) -> AppResult<Vec<Reservation>> {
        let mut conn = self.db.acquire().await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM web_orders WHERE id = $1)",
        )
        .bind(order_id.as_uuid())
        .fetch_one(&mut *conn)
        .await?;
        if !exists {
            return Err(AppError::not_found("Web order", order_id));
        }

        reservations::for_order(&mut conn, order_id).await
    }
}

async fn load_items(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Vec<PricedLine>> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        r#"
        SELECT product_id, quantity, unit_price
        FROM web_order_items
        WHERE web_order_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(PricedLine::from).collect())
}

fn parse_status(status: &str) -> AppResult<WebOrderStatus> {
    WebOrderStatus::from_str(status)
        .ok_or_else(|| AppError::Internal(format!("unknown web order status '{}'", status)))
}

fn to_web_order(row: WebOrderRow, items: Vec<PricedLine>) -> AppResult<WebOrder> {
    Ok(WebOrder {
        id: row.id.into(),
        customer_name: row.customer_name,
        customer_phone: row.customer_phone,
        customer_email: row.customer_email,
        status: parse_status(&row.status)?,
        total_amount: row.total_amount,
        items,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
