//! Web order tests
//!
//! Tests for the web order state machine including:
//! - Free movement between open statuses, terminal statuses are final
//! - Reservations created with the order
//! - Delivery consumes reservations into OUT movements
//! - Cancellation releases reservations without movements
//! - Concurrent orders never oversell a product

mod common;

use proptest::prelude::*;
use shared::{DomainError, TransitionEffect, WebOrderStatus};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// REQUESTED is accepted as an alias of PENDING
    #[test]
    fn test_requested_alias() {
        assert_eq!(
            WebOrderStatus::from_str("REQUESTED"),
            Some(WebOrderStatus::Pending)
        );
        assert_eq!(WebOrderStatus::Pending.as_str(), "PENDING");
    }

    /// Only delivery and cancellation touch reservations
    #[test]
    fn test_transition_effects() {
        use WebOrderStatus::*;
        assert_eq!(Pending.transition_to(Reserved), Ok(TransitionEffect::None));
        assert_eq!(Paid.transition_to(Prepared), Ok(TransitionEffect::None));
        assert_eq!(
            Prepared.transition_to(Delivered),
            Ok(TransitionEffect::ConsumeReservations)
        );
        assert_eq!(
            Reserved.transition_to(Cancelled),
            Ok(TransitionEffect::ReleaseReservations)
        );
    }

    /// Open statuses can move backwards or repeat without side effects
    #[test]
    fn test_open_status_changes_only_update_status() {
        use WebOrderStatus::*;
        assert_eq!(Paid.transition_to(Pending), Ok(TransitionEffect::None));
        assert_eq!(Prepared.transition_to(Reserved), Ok(TransitionEffect::None));
        assert_eq!(Pending.transition_to(Pending), Ok(TransitionEffect::None));
    }

    /// Terminal statuses accept nothing
    #[test]
    fn test_terminal_statuses() {
        use WebOrderStatus::*;
        assert!(matches!(
            Delivered.transition_to(Cancelled),
            Err(DomainError::InvalidStateTransition(_))
        ));
        assert!(matches!(
            Cancelled.transition_to(Delivered),
            Err(DomainError::InvalidStateTransition(_))
        ));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn status_strategy() -> impl Strategy<Value = WebOrderStatus> {
        prop_oneof![
            Just(WebOrderStatus::Pending),
            Just(WebOrderStatus::Reserved),
            Just(WebOrderStatus::Paid),
            Just(WebOrderStatus::Prepared),
            Just(WebOrderStatus::Delivered),
            Just(WebOrderStatus::Cancelled),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Once an order reaches a terminal status it never leaves it, and
        /// reservations are consumed or released at most once.
        #[test]
        fn prop_terminal_is_final(targets in prop::collection::vec(status_strategy(), 1..20)) {
            let mut status = WebOrderStatus::Pending;
            let mut reservation_effects = 0;
            for target in targets {
                match status.transition_to(target) {
                    Ok(effect) => {
                        prop_assert!(!status.is_terminal());
                        if effect != TransitionEffect::None {
                            reservation_effects += 1;
                        }
                        status = target;
                    }
                    Err(_) => {}
                }
            }
            prop_assert!(reservation_effects <= 1);
            prop_assert_eq!(reservation_effects == 1, status.is_terminal());
        }
    }
}

// ============================================================================
// Database Tests
// ============================================================================

mod db_tests {
    use super::common::{self, customer, line};
    use shared::{
        MovementType, PaymentMethod, ReservationStatus, ReservationTransition, SaleType,
        WebOrderStatus,
    };
    use sqlx::PgPool;
    use stock_backend::error::AppError;
    use stock_backend::services::reservations;
    use stock_backend::services::sales::CreateLocalSaleInput;
    use stock_backend::{TxSettings, WebOrderService};

    async fn setup(pool: &PgPool, stock: i32) -> (common::Services, shared::UserId, shared::ProductId) {
        let svc = common::services(pool);
        let actor = common::create_user(pool).await;
        let product =
            common::stocked_product(pool, &svc.stock, actor, "Pan de molde", 2190, stock).await;
        (svc, actor, product)
    }

    /// An order for the whole stock reserves it; a local sale of one then fails
    #[tokio::test]
    async fn test_order_reserves_stock() {
        let Some(pool) = common::test_pool().await else { return };
        let (svc, actor, product) = setup(&pool, 5).await;

        let order = svc
            .orders
            .create_web_order(customer(), vec![line(product, 5)])
            .await
            .unwrap();
        assert_eq!(order.status, WebOrderStatus::Pending);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.total_amount, rust_decimal::Decimal::from(5 * 2190));

        let level = svc.stock.get_stock_level(product).await.unwrap();
        assert_eq!(level.stock_on_hand, 5);
        assert_eq!(level.reserved, 5);
        assert_eq!(level.available(), 0);

        let err = svc
            .sales
            .create_local_sale(
                actor,
                CreateLocalSaleInput {
                    items: vec![line(product, 1)],
                    payment_method: PaymentMethod::Cash,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock {
                requested: 1,
                available: 0,
                ..
            }
        ));
    }

    /// Cancelling releases the reservation and writes no movement
    #[tokio::test]
    async fn test_cancel_releases_reservations() {
        let Some(pool) = common::test_pool().await else { return };
        let (svc, _actor, product) = setup(&pool, 5).await;
        let order = svc
            .orders
            .create_web_order(customer(), vec![line(product, 5)])
            .await
            .unwrap();

        let cancelled = svc
            .orders
            .update_status(order.id, WebOrderStatus::Cancelled, None)
            .await
            .unwrap();
        assert_eq!(cancelled.status, WebOrderStatus::Cancelled);

        let reservations = svc.orders.get_reservations(order.id).await.unwrap();
        assert_eq!(reservations.len(), 1);
        assert_eq!(reservations[0].status, ReservationStatus::Released);

        let level = svc.stock.get_stock_level(product).await.unwrap();
        assert_eq!(level.reserved, 0);
        assert_eq!(level.available(), 5);
        assert_eq!(common::movement_count(&pool, product).await, 1);
    }

    /// Delivering consumes the reservation into one OUT movement
    #[tokio::test]
    async fn test_deliver_consumes_reservations() {
        let Some(pool) = common::test_pool().await else { return };
        let (svc, actor, product) = setup(&pool, 5).await;
        let order = svc
            .orders
            .create_web_order(customer(), vec![line(product, 5)])
            .await
            .unwrap();

        let delivered = svc
            .orders
            .update_status(order.id, WebOrderStatus::Delivered, Some(actor))
            .await
            .unwrap();
        assert_eq!(delivered.status, WebOrderStatus::Delivered);

        let movements = svc.stock.get_movements(product).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].movement_type, MovementType::Out);
        assert_eq!(movements[0].quantity, -5);
        assert_eq!(movements[0].actor_id, actor);
        assert_eq!(
            movements[0].notes.as_deref(),
            Some(format!("Web order: {}", order.id).as_str())
        );

        let reservations = svc.orders.get_reservations(order.id).await.unwrap();
        assert_eq!(reservations[0].status, ReservationStatus::Consumed);

        let level = svc.stock.get_stock_level(product).await.unwrap();
        assert_eq!(level.stock_on_hand, 0);
        assert_eq!(level.reserved, 0);
    }

    /// Delivery without an actor is rejected and changes nothing
    #[tokio::test]
    async fn test_deliver_requires_actor() {
        let Some(pool) = common::test_pool().await else { return };
        let (svc, _actor, product) = setup(&pool, 5).await;
        let order = svc
            .orders
            .create_web_order(customer(), vec![line(product, 2)])
            .await
            .unwrap();

        let err = svc
            .orders
            .update_status(order.id, WebOrderStatus::Delivered, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "actor_id"));

        let current = svc.orders.get_web_order(order.id).await.unwrap();
        assert_eq!(current.status, WebOrderStatus::Pending);
        assert_eq!(svc.stock.get_reserved(product).await.unwrap(), 2);
    }

    /// Terminal orders reject every further transition
    #[tokio::test]
    async fn test_terminal_orders_are_final() {
        let Some(pool) = common::test_pool().await else { return };
        let (svc, actor, product) = setup(&pool, 10).await;

        let delivered = svc
            .orders
            .create_web_order(customer(), vec![line(product, 1)])
            .await
            .unwrap();
        svc.orders
            .update_status(delivered.id, WebOrderStatus::Delivered, Some(actor))
            .await
            .unwrap();
        let err = svc
            .orders
            .update_status(delivered.id, WebOrderStatus::Cancelled, Some(actor))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));

        let cancelled = svc
            .orders
            .create_web_order(customer(), vec![line(product, 1)])
            .await
            .unwrap();
        svc.orders
            .update_status(cancelled.id, WebOrderStatus::Cancelled, None)
            .await
            .unwrap();
        let err = svc
            .orders
            .update_status(cancelled.id, WebOrderStatus::Delivered, Some(actor))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));

        // Only the delivered order moved stock
        assert_eq!(svc.stock.get_stock_on_hand(product).await.unwrap(), 9);
        assert_eq!(svc.stock.get_reserved(product).await.unwrap(), 0);
    }

    /// Open statuses move in any order while reservations stay held
    #[tokio::test]
    async fn test_open_status_path() {
        let Some(pool) = common::test_pool().await else { return };
        let (svc, actor, product) = setup(&pool, 3).await;
        let order = svc
            .orders
            .create_web_order(customer(), vec![line(product, 3)])
            .await
            .unwrap();

        for status in [
            WebOrderStatus::Reserved,
            WebOrderStatus::Paid,
            WebOrderStatus::Prepared,
        ] {
            let updated = svc
                .orders
                .update_status(order.id, status, Some(actor))
                .await
                .unwrap();
            assert_eq!(updated.status, status);
            assert_eq!(svc.stock.get_reserved(product).await.unwrap(), 3);
        }

        for status in [WebOrderStatus::Paid, WebOrderStatus::Paid, WebOrderStatus::Pending] {
            let updated = svc
                .orders
                .update_status(order.id, status, None)
                .await
                .unwrap();
            assert_eq!(updated.status, status);
        }
        assert_eq!(svc.stock.get_reserved(product).await.unwrap(), 3);
        assert_eq!(common::movement_count(&pool, product).await, 1);

        svc.orders
            .update_status(order.id, WebOrderStatus::Delivered, Some(actor))
            .await
            .unwrap();
        assert_eq!(svc.stock.get_stock_on_hand(product).await.unwrap(), 0);
    }

    /// Repeating a release or consume is a no-op; crossing terminals fails
    #[tokio::test]
    async fn test_reservation_status_changes_are_idempotent() {
        let Some(pool) = common::test_pool().await else { return };
        let (svc, _actor, product) = setup(&pool, 6).await;
        let released_order = svc
            .orders
            .create_web_order(customer(), vec![line(product, 2)])
            .await
            .unwrap();
        let consumed_order = svc
            .orders
            .create_web_order(customer(), vec![line(product, 1)])
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();

        let mut held = svc.orders.get_reservations(released_order.id).await.unwrap();
        let mut stale = held[0].clone();
        let first = reservations::release(&mut conn, &mut held[0]).await.unwrap();
        assert_eq!(first, ReservationTransition::Apply);
        assert_eq!(held[0].status, ReservationStatus::Released);

        // The stored status is re-read, so a stale ACTIVE copy sees RELEASED
        let repeated = reservations::release(&mut conn, &mut stale).await.unwrap();
        assert_eq!(repeated, ReservationTransition::NoOp);
        assert_eq!(stale.status, ReservationStatus::Released);

        let err = reservations::consume(&mut conn, &mut held[0])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));

        let mut held = svc.orders.get_reservations(consumed_order.id).await.unwrap();
        let first = reservations::consume(&mut conn, &mut held[0]).await.unwrap();
        assert_eq!(first, ReservationTransition::Apply);
        let repeated = reservations::consume(&mut conn, &mut held[0]).await.unwrap();
        assert_eq!(repeated, ReservationTransition::NoOp);
        let err = reservations::release(&mut conn, &mut held[0])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));

        assert_eq!(svc.stock.get_reserved(product).await.unwrap(), 0);
        let statuses: Vec<_> = svc
            .orders
            .get_reservations(released_order.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.status)
            .collect();
        assert_eq!(statuses, vec![ReservationStatus::Released]);
    }

    /// Orders can be listed by status and unknown orders are NotFound
    #[tokio::test]
    async fn test_read_back() {
        let Some(pool) = common::test_pool().await else { return };
        let (svc, _actor, product) = setup(&pool, 4).await;
        let order = svc
            .orders
            .create_web_order(customer(), vec![line(product, 1), line(product, 2)])
            .await
            .unwrap();
        assert_eq!(order.items.len(), 2);
        assert_eq!(svc.orders.get_reservations(order.id).await.unwrap().len(), 2);
        assert_eq!(svc.stock.get_reserved(product).await.unwrap(), 3);

        let fetched = svc.orders.get_web_order(order.id).await.unwrap();
        assert_eq!(fetched.items, order.items);
        assert_eq!(fetched.customer_email.as_deref(), Some("cliente@minimarket.cl"));

        let pending = svc
            .orders
            .list_web_orders(Some(WebOrderStatus::Pending), 200)
            .await
            .unwrap();
        assert!(pending.iter().any(|o| o.id == order.id));
        let delivered = svc
            .orders
            .list_web_orders(Some(WebOrderStatus::Delivered), 200)
            .await
            .unwrap();
        assert!(delivered.iter().all(|o| o.id != order.id));

        let err = svc
            .orders
            .get_web_order(shared::WebOrderId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = svc
            .orders
            .update_status(shared::WebOrderId::new(), WebOrderStatus::Paid, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    /// Order creation validates the customer and the lines
    #[tokio::test]
    async fn test_create_validation() {
        let Some(pool) = common::test_pool().await else { return };
        let (svc, _actor, product) = setup(&pool, 4).await;

        let mut nameless = customer();
        nameless.name = "  ".to_string();
        let err = svc
            .orders
            .create_web_order(nameless, vec![line(product, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = svc
            .orders
            .create_web_order(customer(), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = svc
            .orders
            .create_web_order(customer(), vec![line(shared::ProductId::new(), 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(svc.stock.get_reserved(product).await.unwrap(), 0);
    }

    /// A configured TTL stamps the reservations with an expiry
    #[tokio::test]
    async fn test_reservation_ttl() {
        let Some(pool) = common::test_pool().await else { return };
        let (_svc, _actor, product) = setup(&pool, 4).await;
        let orders = WebOrderService::new(pool.clone(), TxSettings::default(), Some(30));

        let order = orders
            .create_web_order(customer(), vec![line(product, 1)])
            .await
            .unwrap();
        let reservations = orders.get_reservations(order.id).await.unwrap();
        let expires_at = reservations[0].expires_at.expect("expiry set");
        assert!(expires_at > reservations[0].created_at);
    }

    /// Concurrent orders for the same product never reserve more than stock
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_orders_do_not_oversell() {
        let Some(pool) = common::test_pool().await else { return };
        let (svc, actor, product) = setup(&pool, 5).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let orders = svc.orders.clone();
            handles.push(tokio::spawn(async move {
                orders
                    .create_web_order(customer(), vec![line(product, 1)])
                    .await
                    .map(|_| ())
            }));
        }
        for _ in 0..4 {
            let sales = svc.sales.clone();
            handles.push(tokio::spawn(async move {
                sales
                    .create_local_sale(
                        actor,
                        CreateLocalSaleInput {
                            items: vec![line(product, 1)],
                            payment_method: PaymentMethod::Debit,
                        },
                    )
                    .await
                    .map(|_| ())
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => accepted += 1,
                Err(AppError::InsufficientStock { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(accepted, 5);

        let level = svc.stock.get_stock_level(product).await.unwrap();
        assert_eq!(level.available(), 0);
        assert!(level.stock_on_hand >= 0);
        assert_eq!(level.stock_on_hand - level.reserved, 0);

        let sales_paid: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM payments p
            JOIN local_sale_items i ON i.local_sale_id = p.reference_id
            WHERE p.sale_type = $1 AND i.product_id = $2
            "#,
        )
        .bind(SaleType::LocalSale.as_str())
        .bind(product.as_uuid())
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(sales_paid, 5 - level.stock_on_hand);
    }
}
