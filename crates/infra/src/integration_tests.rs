//! End-to-end scenarios over the in-memory store.
//!
//! Tests: deposit / stock → placement flow → store → event bus → projection → settlement
//!
//! Verifies:
//! - The happy path moves money and stock atomically
//! - Business-rule failures leave balances and stock untouched and a FAILED order row
//! - Concurrent placements on the same SKU never oversell
//! - Settlement reconciles merchant books and is repeatable

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::{Duration, Instant};

    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use tradeflow_core::{AggregateRoot, DomainError, FixedClock, Money};
    use tradeflow_orders::{Order, OrderEvent, OrderStatus};

    use crate::projections::OrderActivityProjection;
    use crate::services::{ServiceError, TradingServices};
    use crate::store::{
        InMemoryStore, MerchantAccountRepository, OrderRepository, ProductRepository, Store,
        TxMode, UserAccountRepository,
    };
    use crate::workers::EventWorker;

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()))
    }

    fn setup_with(sku_lock: Option<Duration>) -> (Arc<InMemoryStore>, TradingServices<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let services = TradingServices::new(Arc::clone(&store), clock(), sku_lock);
        (store, services)
    }

    fn setup() -> (Arc<InMemoryStore>, TradingServices<InMemoryStore>) {
        setup_with(None)
    }

    /// u1 with 100.00; m1 selling sku1 "X" at 10.00 with `stock` units.
    fn seed(services: &TradingServices<InMemoryStore>, stock: i64) {
        services.accounts.deposit("u1", dec!(100.00)).unwrap();
        services
            .inventory
            .add_or_update_product_stock("m1", "sku1", "X", dec!(10.00), stock)
            .unwrap();
    }

    struct Books {
        stock: u64,
        sold: u64,
        user: Money,
        merchant: Money,
        orders: Vec<Order>,
    }

    fn books(store: &InMemoryStore, username: &str) -> Books {
        let mut tx = store.begin(TxMode::ReadOnly).unwrap();
        let product = tx.find_product_by_sku("sku1").unwrap().unwrap();
        let user = tx.find_user_by_username(username).unwrap().unwrap();
        let merchant = tx.find_merchant_by_name("m1").unwrap().unwrap();
        Books {
            stock: product.stock_quantity().value(),
            sold: product.sold_quantity().value(),
            user: user.balance(),
            merchant: merchant.balance(),
            orders: tx.list_orders().unwrap(),
        }
    }

    #[test]
    fn happy_path() {
        let (store, services) = setup();
        seed(&services, 10);

        let order = services.placement.place_order("u1", "sku1", 2).unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        assert_eq!(order.total_price(), Money::from_cents(2000));
        assert_eq!(order.unit_price(), Money::from_cents(1000));

        let b = books(&store, "u1");
        assert_eq!((b.stock, b.sold), (8, 2));
        assert_eq!(b.user, Money::from_cents(8000));
        assert_eq!(b.merchant, Money::from_cents(2000));

        let id = order.id().unwrap();
        assert_eq!(services.orders.find_order(id).unwrap(), order);
    }

    #[test]
    fn insufficient_stock_changes_nothing_but_records_a_failed_order() {
        let (store, services) = setup();
        seed(&services, 10);

        let err = services.placement.place_order("u1", "sku1", 11).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InsufficientStock { requested: 11, available: 10 })
        ));

        let b = books(&store, "u1");
        assert_eq!((b.stock, b.sold), (10, 0));
        assert_eq!(b.user, Money::from_cents(10_000));
        assert_eq!(b.merchant, Money::zero());
        assert_eq!(b.orders.len(), 1);
        assert_eq!(b.orders[0].status(), OrderStatus::Failed);
    }

    #[test]
    fn insufficient_balance_records_a_failed_order() {
        let (store, services) = setup();
        seed(&services, 10);
        services.accounts.deposit("u2", dec!(5.00)).unwrap();

        let err = services.placement.place_order("u2", "sku1", 1).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InsufficientBalance { required, available })
                if required == Money::from_cents(1000) && available == Money::from_cents(500)
        ));

        let b = books(&store, "u2");
        assert_eq!((b.stock, b.sold), (10, 0));
        assert_eq!(b.user, Money::from_cents(500));
        assert_eq!(b.merchant, Money::zero());
        assert_eq!(b.orders.len(), 1);
        assert_eq!(b.orders[0].status(), OrderStatus::Failed);
    }

    #[test]
    fn cross_merchant_sku_is_rejected_without_mutation() {
        let (store, services) = setup();
        seed(&services, 10);

        let err = services
            .inventory
            .add_or_update_product_stock("m2", "sku1", "X", dec!(10.00), 5)
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::ProductBelongsToAnotherMerchant { .. })
        ));

        let b = books(&store, "u1");
        assert_eq!(b.stock, 10);
    }

    #[test]
    fn settlement_after_a_sale_is_balanced() {
        let (_, services) = setup();
        seed(&services, 10);
        services.placement.place_order("u1", "sku1", 2).unwrap();

        let results = services.settlement.settle().unwrap();
        assert_eq!(results.len(), 1);
        let m1 = &results[0];
        assert_eq!(m1.merchant_name, "m1");
        assert_eq!(m1.expected, Money::from_cents(2000));
        assert_eq!(m1.actual, Money::from_cents(2000));
        assert_eq!(m1.diff, Money::zero());
        assert_eq!(m1.diff.to_string(), "0.00");

        assert_eq!(results, services.settlement.settle().unwrap());
    }

    fn race_two_orders_of_five(sku_lock: Option<Duration>) -> (Arc<InMemoryStore>, Vec<Result<Order, ServiceError>>) {
        let (store, services) = setup_with(sku_lock);
        seed(&services, 8);
        let services = Arc::new(services);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let services = Arc::clone(&services);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    services.placement.place_order("u1", "sku1", 5)
                })
            })
            .collect();

        let results = handles.into_iter().map(|h| h.join().unwrap()).collect();
        (store, results)
    }

    fn assert_exactly_one_sale(store: &InMemoryStore, results: &[Result<Order, ServiceError>]) {
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

        let b = books(store, "u1");
        assert_eq!((b.stock, b.sold), (3, 5));
        assert_eq!(b.user, Money::from_cents(5000));
        assert_eq!(b.merchant, Money::from_cents(5000));

        let statuses: Vec<_> = b.orders.iter().map(Order::status).collect();
        assert_eq!(statuses.len(), 2);
        assert!(statuses.contains(&OrderStatus::Completed));
        assert!(statuses.contains(&OrderStatus::Failed));
    }

    #[test]
    fn concurrent_placements_never_oversell() {
        let (store, results) = race_two_orders_of_five(None);
        assert_exactly_one_sale(&store, &results);

        let err = results.into_iter().find_map(Result::err).unwrap();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InsufficientStock { .. })
                | ServiceError::ConcurrencyConflict(_)
        ));
    }

    #[test]
    fn sku_lock_serialises_concurrent_placements() {
        let (store, results) = race_two_orders_of_five(Some(Duration::from_secs(5)));
        assert_exactly_one_sale(&store, &results);

        let err = results.into_iter().find_map(Result::err).unwrap();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InsufficientStock { requested: 5, available: 3 })
        ));
    }

    #[test]
    fn activity_projection_follows_the_bus() {
        let (_, services) = setup();
        seed(&services, 10);

        let projection = Arc::new(OrderActivityProjection::new());
        let sink = Arc::clone(&projection);
        let worker = EventWorker::spawn("order-activity", &services.bus, move |event: OrderEvent| {
            sink.apply(&event)
        })
            .unwrap();

        let completed = services.placement.place_order("u1", "sku1", 1).unwrap();
        let _ = services.placement.place_order("u1", "sku1", 50).unwrap_err();

        let deadline = Instant::now() + Duration::from_secs(2);
        while projection.all().len() < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        worker.shutdown();

        let rows = projection.all();
        assert_eq!(rows.len(), 2);
        assert_eq!(Some(rows[0].order_id), completed.id());
        assert!(rows[0].is_completed());
        assert!(!rows[1].is_completed());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

        /// Merchant balance = Σ completed totals, and sold + stock = total added.
        #[test]
        fn books_balance_after_any_order_sequence(quantities in prop::collection::vec(1i64..6, 1..12)) {
            let (store, services) = setup();
            seed(&services, 20);

            let mut completed_total = Money::zero();
            for qty in quantities {
                if let Ok(order) = services.placement.place_order("u1", "sku1", qty) {
                    prop_assert_eq!(order.total_price(), order.unit_price().multiply(qty as u64).unwrap());
                    completed_total = completed_total.add(order.total_price()).unwrap();
                }
            }

            let b = books(&store, "u1");
            prop_assert_eq!(b.merchant, completed_total);
            prop_assert_eq!(b.stock + b.sold, 20);
            prop_assert_eq!(b.user.add(b.merchant).unwrap(), Money::from_cents(10_000));
            prop_assert!(services.settlement.settle().unwrap().iter().all(|r| r.is_balanced()));
        }
    }
}
