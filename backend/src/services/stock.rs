//! Stock accounting service
//!
//! Purchases, manual adjustments and stock queries. Also provides the
//! availability primitives the sale and web order coordinators run inside
//! their own transactions.

use std::collections::BTreeMap;

use serde::Deserialize;
use shared::{
    demand_by_product, validate_adjustment, validate_purchase, DocumentRef, DomainError,
    LineRequest, Movement, MovementReason, NewMovement, ProductId, StockDelta, StockDrift,
    StockLevel, UserId,
};
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use super::catalog::{self, ProductRecord};
use super::{ledger, reservations};
use crate::db::{self, TxSettings};
use crate::error::{AppError, AppResult};

/// Stock accounting service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
    tx_settings: TxSettings,
}

/// Input for registering a supplier purchase
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterPurchaseInput {
    pub product_id: ProductId,
    pub quantity: i32,
    #[validate(length(max = 64))]
    pub document_type: Option<String>,
    #[validate(length(max = 64))]
    pub document_number: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Input for a manual stock adjustment (positive or negative)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterAdjustmentInput {
    pub product_id: ProductId,
    pub quantity: i32,
    pub reason: MovementReason,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Attach the product name to a stock rejection and log it
pub(crate) fn reject(product: &ProductRecord, err: DomainError) -> AppError {
    let err = err.with_product_name(&product.name);
    tracing::warn!(product_id = %product.id, error = %err, "Stock operation rejected");
    err.into()
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool, tx_settings: TxSettings) -> Self {
        Self { db, tx_settings }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Register goods received from a supplier
    pub async fn register_purchase(
        &self,
        actor_id: UserId,
        input: RegisterPurchaseInput,
    ) -> AppResult<Movement> {
        input.validate()?;
        validate_purchase(
            input.quantity,
            input.document_type.as_deref(),
            input.document_number.as_deref(),
        )?;

        let document = match (input.document_type, input.document_number) {
            (Some(document_type), Some(document_number)) => Some(DocumentRef {
                document_type: document_type.trim().to_string(),
                document_number: document_number.trim().to_string(),
            }),
            _ => None,
        };

        let mut tx = db::begin_write(&self.db, self.tx_settings).await?;
        catalog::lock_products(&mut tx, [input.product_id]).await?;

        let movement = ledger::append(
            &mut tx,
            NewMovement {
                product_id: input.product_id,
                delta: StockDelta::In(input.quantity.unsigned_abs()),
                reason: MovementReason::Purchase,
                actor_id,
                document,
                notes: input.notes,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %movement.product_id,
            quantity = movement.quantity,
            actor_id = %actor_id,
            "Purchase registered"
        );

        Ok(movement)
    }

    /// Register a manual adjustment. Rejected when stock on hand would go
    /// negative or below what active reservations hold.
    pub async fn register_adjustment(
        &self,
        actor_id: UserId,
        input: RegisterAdjustmentInput,
    ) -> AppResult<Movement> {
        input.validate()?;
        validate_adjustment(input.quantity, input.reason)?;

        let mut tx = db::begin_write(&self.db, self.tx_settings).await?;
        let products = catalog::lock_products(&mut tx, [input.product_id]).await?;
        let product = products
            .get(&input.product_id)
            .ok_or_else(|| AppError::not_found("Product", input.product_id))?;

        let level = Self::stock_level(&mut tx, input.product_id).await?;
        level
            .project_adjustment(i64::from(input.quantity))
            .map_err(|err| reject(product, err))?;

        let movement = ledger::append(
            &mut tx,
            NewMovement {
                product_id: input.product_id,
                delta: StockDelta::Adjust(input.quantity),
                reason: input.reason,
                actor_id,
                document: None,
                notes: input.notes,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %movement.product_id,
            quantity = movement.quantity,
            reason = movement.reason.as_str(),
            actor_id = %actor_id,
            "Adjustment registered"
        );

        Ok(movement)
    }

    /// Rebuild the stock projection from the ledger and report what drifted
    pub async fn reconcile(&self, product_id: Option<ProductId>) -> AppResult<Vec<StockDrift>> {
        let mut tx = db::begin_write(&self.db, self.tx_settings).await?;
        match product_id {
            Some(product_id) => {
                catalog::lock_products(&mut tx, [product_id]).await?;
            }
            None => catalog::lock_all_products(&mut tx).await?,
        }

        let drifts = ledger::reconcile(&mut tx, product_id).await?;
        tx.commit().await?;

        tracing::info!(drifted = drifts.len(), "Stock projection reconciled");
        Ok(drifts)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Stock on hand, reserved and available from one snapshot
    pub async fn get_stock_level(&self, product_id: ProductId) -> AppResult<StockLevel> {
        let mut tx = db::begin_snapshot(&self.db).await?;
        catalog::ensure_product_exists(&mut tx, product_id).await?;
        let level = Self::stock_level(&mut tx, product_id).await?;
        tx.commit().await?;
        Ok(level)
    }

    pub async fn get_stock_on_hand(&self, product_id: ProductId) -> AppResult<i64> {
        Ok(self.get_stock_level(product_id).await?.stock_on_hand)
    }

    pub async fn get_reserved(&self, product_id: ProductId) -> AppResult<i64> {
        Ok(self.get_stock_level(product_id).await?.reserved)
    }

    pub async fn get_available(&self, product_id: ProductId) -> AppResult<i64> {
        Ok(self.get_stock_level(product_id).await?.available())
    }

    /// Movements of a product, newest first
    pub async fn get_movements(&self, product_id: ProductId) -> AppResult<Vec<Movement>> {
        let mut conn = self.db.acquire().await?;
        catalog::ensure_product_exists(&mut conn, product_id).await?;
        ledger::movements_for(&mut conn, product_id).await
    }

    // ========================================================================
    // In-transaction primitives
    // ========================================================================

    /// Stock level read inside the caller's transaction
    pub(crate) async fn stock_level(
        conn: &mut PgConnection,
        product_id: ProductId,
    ) -> AppResult<StockLevel> {
        let on_hand = ledger::stock_on_hand(conn, product_id).await?;
        let reserved = reservations::reserved_quantity(conn, product_id).await?;
        Ok(StockLevel::new(product_id, on_hand, reserved))
    }

    /// Lock every product named by `lines` and check that the combined
    /// demand per product fits what is available.
    pub(crate) async fn lock_and_check(
        conn: &mut PgConnection,
        lines: &[LineRequest],
    ) -> AppResult<BTreeMap<ProductId, ProductRecord>> {
        let demand = demand_by_product(lines);
        let products = catalog::lock_products(conn, demand.keys().copied()).await?;

        for (product_id, requested) in &demand {
            let product = products
                .get(product_id)
                .ok_or_else(|| AppError::not_found("Product", product_id))?;
            let level = Self::stock_level(conn, *product_id).await?;
            level
                .ensure_available(*requested)
                .map_err(|err| reject(product, err))?;
        }

        Ok(products)
    }
}
