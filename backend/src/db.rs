//! Transaction helpers for stock operations
//!
//! Every operation that reads stock and then writes movements or
//! reservations runs inside one write transaction opened here. Product rows
//! are locked inside that transaction before any stock is read.

use sqlx::{PgPool, Postgres, Transaction};

use crate::config::DatabaseConfig;
use crate::error::AppResult;

/// Timeouts applied to a stock write transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSettings {
    pub statement_timeout_ms: u64,
    pub lock_timeout_ms: u64,
}

impl TxSettings {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            statement_timeout_ms: config.statement_timeout_ms,
            lock_timeout_ms: config.lock_timeout_ms,
        }
    }
}

impl Default for TxSettings {
    fn default() -> Self {
        Self {
            statement_timeout_ms: 5000,
            lock_timeout_ms: 3000,
        }
    }
}

/// Open a read-write transaction with the configured timeouts.
///
/// The settings are transaction-local, so they are reset when the
/// connection goes back to the pool.
pub async fn begin_write(
    pool: &PgPool,
    settings: TxSettings,
) -> AppResult<Transaction<'static, Postgres>> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "SELECT set_config('statement_timeout', $1, true), set_config('lock_timeout', $2, true)",
    )
    .bind(settings.statement_timeout_ms.to_string())
    .bind(settings.lock_timeout_ms.to_string())
    .execute(&mut *tx)
    .await?;

    Ok(tx)
}

/// Open a read-only snapshot so that on-hand and reserved totals are read
/// from the same point in time.
pub async fn begin_snapshot(pool: &PgPool) -> AppResult<Transaction<'static, Postgres>> {
    let mut tx = pool.begin().await?;

    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
