//! Movement ledger
//!
//! Append-only storage of stock movements. Stock on hand is always the sum of
//! the signed quantities stored here; the `stock_levels` table is a running
//! total kept in the same transaction and can be rebuilt with [`reconcile`].

use chrono::{DateTime, Utc};
use shared::{Movement, MovementReason, MovementType, NewMovement, ProductId, StockDrift};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use super::catalog;
use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    product_id: Uuid,
    movement_type: String,
    reason: String,
    quantity: i32,
    document_type: Option<String>,
    document_number: Option<String>,
    notes: Option<String>,
    actor_id: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let movement_type = MovementType::from_str(&row.movement_type).ok_or_else(|| {
            AppError::Internal(format!("unknown movement type '{}'", row.movement_type))
        })?;
        let reason = MovementReason::from_str(&row.reason)
            .ok_or_else(|| AppError::Internal(format!("unknown movement reason '{}'", row.reason)))?;

        Ok(Movement {
            id: row.id.into(),
            product_id: row.product_id.into(),
            movement_type,
            reason,
            quantity: row.quantity,
            document_type: row.document_type,
            document_number: row.document_number,
            notes: row.notes,
            actor_id: row.actor_id.into(),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct DriftRow {
    product_id: Uuid,
    projected: i64,
    ledger: i64,
}

/// Append a movement. Performs no business checks beyond resolving the
/// product and the actor.
pub async fn append(conn: &mut PgConnection, movement: NewMovement) -> AppResult<Movement> {
    let quantity = movement.delta.signed()?;

    catalog::ensure_product_exists(conn, movement.product_id).await?;
    catalog::ensure_user_exists(conn, movement.actor_id).await?;

    let (document_type, document_number) = match movement.document {
        Some(doc) => (Some(doc.document_type), Some(doc.document_number)),
        None => (None, None),
    };

    let row = sqlx::query_as::<_, MovementRow>(
        r#"
        INSERT INTO inventory_movements (
            product_id, movement_type, reason, quantity,
            document_type, document_number, notes, actor_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, product_id, movement_type, reason, quantity,
                  document_type, document_number, notes, actor_id, created_at
        "#,
    )
    .bind(movement.product_id.as_uuid())
    .bind(movement.delta.movement_type().as_str())
    .bind(movement.reason.as_str())
    .bind(quantity)
    .bind(&document_type)
    .bind(&document_number)
    .bind(&movement.notes)
    .bind(movement.actor_id.as_uuid())
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO stock_levels (product_id, stock_on_hand, updated_at)
        VALUES ($1, $2, NOW())
        ON CONFLICT (product_id) DO UPDATE
        SET stock_on_hand = stock_levels.stock_on_hand + EXCLUDED.stock_on_hand,
            updated_at = NOW()
        "#,
    )
    .bind(movement.product_id.as_uuid())
    .bind(i64::from(quantity))
    .execute(&mut *conn)
    .await?;

    tracing::debug!(
        product_id = %movement.product_id,
        movement_type = movement.delta.movement_type().as_str(),
        reason = movement.reason.as_str(),
        quantity,
        "Movement appended"
    );

    row.try_into()
}

/// Stock on hand from the ledger aggregate
pub async fn stock_on_hand(conn: &mut PgConnection, product_id: ProductId) -> AppResult<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM inventory_movements WHERE product_id = $1",
    )
    .bind(product_id.as_uuid())
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// All movements of a product, newest first
pub async fn movements_for(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> AppResult<Vec<Movement>> {
    let rows = sqlx::query_as::<_, MovementRow>(
        r#"
        SELECT id, product_id, movement_type, reason, quantity,
               document_type, document_number, notes, actor_id, created_at
        FROM inventory_movements
        WHERE product_id = $1
        ORDER BY seq DESC
        "#,
    )
    .bind(product_id.as_uuid())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Movement::try_from).collect()
}

/// Compare the `stock_levels` projection with the ledger, report every
/// divergence and rewrite the projection from the ledger.
///
/// The caller is expected to hold the product locks for the rows it
/// reconciles, otherwise a concurrent append may race the rewrite.
pub async fn reconcile(
    conn: &mut PgConnection,
    product_id: Option<ProductId>,
) -> AppResult<Vec<StockDrift>> {
    let rows = sqlx::query_as::<_, DriftRow>(
        r#"
        SELECT p.id AS product_id,
               COALESCE(sl.stock_on_hand, 0)::BIGINT AS projected,
               COALESCE(m.total, 0)::BIGINT AS ledger
        FROM products p
        LEFT JOIN stock_levels sl ON sl.product_id = p.id
        LEFT JOIN (
            SELECT product_id, SUM(quantity) AS total
            FROM inventory_movements
            GROUP BY product_id
        ) m ON m.product_id = p.id
        WHERE ($1::UUID IS NULL OR p.id = $1)
          AND COALESCE(sl.stock_on_hand, 0) <> COALESCE(m.total, 0)
        ORDER BY p.id
        "#,
    )
    .bind(product_id.map(Uuid::from))
    .fetch_all(&mut *conn)
    .await?;

    let mut drifts = Vec::with_capacity(rows.len());
    for row in rows {
        sqlx::query(
            r#"
            INSERT INTO stock_levels (product_id, stock_on_hand, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (product_id) DO UPDATE
            SET stock_on_hand = EXCLUDED.stock_on_hand, updated_at = NOW()
            "#,
        )
        .bind(row.product_id)
        .bind(row.ledger)
        .execute(&mut *conn)
        .await?;

        let drift = StockDrift {
            product_id: row.product_id.into(),
            projected: row.projected,
            ledger: row.ledger,
        };
        tracing::warn!(
            product_id = %drift.product_id,
            projected = drift.projected,
            ledger = drift.ledger,
            difference = drift.difference(),
            "Stock projection drift repaired"
        );
        drifts.push(drift);
    }

    Ok(drifts)
}
