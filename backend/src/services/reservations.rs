//! Reservation manager
//!
//! Holds stock for web order items. Availability is checked by the caller
//! before [`reserve`] is invoked, under the same product locks.

use chrono::{DateTime, Utc};
use shared::{
    validate_quantity, ProductId, Reservation, ReservationStatus, ReservationTransition,
    WebOrderId,
};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
struct ReservationRow {
    id: Uuid,
    product_id: Uuid,
    web_order_id: Uuid,
    quantity: i32,
    status: String,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = AppError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let status = ReservationStatus::from_str(&row.status).ok_or_else(|| {
            AppError::Internal(format!("unknown reservation status '{}'", row.status))
        })?;

        Ok(Reservation {
            id: row.id.into(),
            product_id: row.product_id.into(),
            web_order_id: row.web_order_id.into(),
            quantity: row.quantity,
            status,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

/// Create an ACTIVE reservation
pub async fn reserve(
    conn: &mut PgConnection,
    product_id: ProductId,
    web_order_id: WebOrderId,
    quantity: i32,
    expires_at: Option<DateTime<Utc>>,
) -> AppResult<Reservation> {
    validate_quantity("quantity", quantity)?;

    let row = sqlx::query_as::<_, ReservationRow>(
        r#"
        INSERT INTO stock_reservations (product_id, web_order_id, quantity, status, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, product_id, web_order_id, quantity, status, created_at, expires_at
        "#,
    )
    .bind(product_id.as_uuid())
    .bind(web_order_id.as_uuid())
    .bind(quantity)
    .bind(ReservationStatus::Active.as_str())
    .bind(expires_at)
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}

/// Quantity held by ACTIVE reservations of a product
pub async fn reserved_quantity(conn: &mut PgConnection, product_id: ProductId) -> AppResult<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COALESCE(SUM(quantity), 0)::BIGINT
        FROM stock_reservations
        WHERE product_id = $1 AND status = 'ACTIVE'
        "#,
    )
    .bind(product_id.as_uuid())
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// ACTIVE reservations of an order, in product order
pub async fn active_for_order(
    conn: &mut PgConnection,
    web_order_id: WebOrderId,
) -> AppResult<Vec<Reservation>> {
    let rows = sqlx::query_as::<_, ReservationRow>(
        r#"
        SELECT id, product_id, web_order_id, quantity, status, created_at, expires_at
        FROM stock_reservations
        WHERE web_order_id = $1 AND status = 'ACTIVE'
        ORDER BY product_id, created_at
        "#,
    )
    .bind(web_order_id.as_uuid())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Reservation::try_from).collect()
}

/// Every reservation of an order regardless of status
pub async fn for_order(
    conn: &mut PgConnection,
    web_order_id: WebOrderId,
) -> AppResult<Vec<Reservation>> {
    let rows = sqlx::query_as::<_, ReservationRow>(
        r#"
        SELECT id, product_id, web_order_id, quantity, status, created_at, expires_at
        FROM stock_reservations
        WHERE web_order_id = $1
        ORDER BY created_at, product_id
        "#,
    )
    .bind(web_order_id.as_uuid())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Reservation::try_from).collect()
}

/// Mark a reservation CONSUMED. No-op when it is already consumed.
pub async fn consume(
    conn: &mut PgConnection,
    reservation: &mut Reservation,
) -> AppResult<ReservationTransition> {
    set_status(conn, reservation, ReservationStatus::Consumed).await
}

/// Mark a reservation RELEASED. No-op when it is already released.
pub async fn release(
    conn: &mut PgConnection,
    reservation: &mut Reservation,
) -> AppResult<ReservationTransition> {
    set_status(conn, reservation, ReservationStatus::Released).await
}

async fn set_status(
    conn: &mut PgConnection,
    reservation: &mut Reservation,
    target: ReservationStatus,
) -> AppResult<ReservationTransition> {
    // Re-read under a row lock; the in-memory copy may be stale.
    let current = sqlx::query_scalar::<_, String>(
        "SELECT status FROM stock_reservations WHERE id = $1 FOR UPDATE",
    )
    .bind(reservation.id.as_uuid())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Reservation", reservation.id))?;

    reservation.status = ReservationStatus::from_str(&current)
        .ok_or_else(|| AppError::Internal(format!("unknown reservation status '{}'", current)))?;

    let outcome = reservation.transition(target)?;
    if outcome == ReservationTransition::Apply {
        sqlx::query("UPDATE stock_reservations SET status = $2 WHERE id = $1")
            .bind(reservation.id.as_uuid())
            .bind(target.as_str())
            .execute(&mut *conn)
            .await?;
    }

    Ok(outcome)
}
