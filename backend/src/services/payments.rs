//! Payment register
//!
//! Payments are append-only and reference either a local sale or a web order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{Payment, PaymentMethod, SaleType};
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    sale_type: String,
    reference_id: Uuid,
    method: String,
    amount: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let sale_type = SaleType::from_str(&row.sale_type)
            .ok_or_else(|| AppError::Internal(format!("unknown sale type '{}'", row.sale_type)))?;
        let method = PaymentMethod::from_str(&row.method)
            .ok_or_else(|| AppError::Internal(format!("unknown payment method '{}'", row.method)))?;

        Ok(Payment {
            id: row.id.into(),
            sale_type,
            reference_id: row.reference_id,
            method,
            amount: row.amount,
            created_at: row.created_at,
        })
    }
}

/// Append a payment
pub async fn record(
    conn: &mut PgConnection,
    sale_type: SaleType,
    reference_id: Uuid,
    method: PaymentMethod,
    amount: Decimal,
) -> AppResult<Payment> {
    let row = sqlx::query_as::<_, PaymentRow>(
        r#"
        INSERT INTO payments (sale_type, reference_id, method, amount)
        VALUES ($1, $2, $3, $4)
        RETURNING id, sale_type, reference_id, method, amount, created_at
        "#,
    )
    .bind(sale_type.as_str())
    .bind(reference_id)
    .bind(method.as_str())
    .bind(amount)
    .fetch_one(&mut *conn)
    .await?;

    row.try_into()
}

/// Payments recorded against a sale or order, oldest first
pub async fn for_reference(
    conn: &mut PgConnection,
    sale_type: SaleType,
    reference_id: Uuid,
) -> AppResult<Vec<Payment>> {
    let rows = sqlx::query_as::<_, PaymentRow>(
        r#"
        SELECT id, sale_type, reference_id, method, amount, created_at
        FROM payments
        WHERE sale_type = $1 AND reference_id = $2
        ORDER BY created_at, id
        "#,
    )
    .bind(sale_type.as_str())
    .bind(reference_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Payment::try_from).collect()
}
