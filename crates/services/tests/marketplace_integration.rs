//! End-to-end tests for the marketplace service layer.

use std::sync::Arc;

use common::UserId;
use domain::{Money, OrderStatus, Profile};
use notify::{ChangeKind, RecordingSubscriber};
use services::{ServiceError, Services};
use store::{
    InMemoryApiaryRepository, InMemoryCartItemRepository, InMemoryHiveRepository,
    InMemoryOrderRepository, InMemoryProductRepository, InMemoryUserRepository,
};

struct TestHarness {
    services: Services,
    apiaries: Arc<InMemoryApiaryRepository>,
    orders: Arc<InMemoryOrderRepository>,
    recorder: Arc<RecordingSubscriber>,
}

impl TestHarness {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let users = Arc::new(InMemoryUserRepository::new());
        let apiaries = Arc::new(InMemoryApiaryRepository::new());
        let hives = Arc::new(InMemoryHiveRepository::new());
        let products = Arc::new(InMemoryProductRepository::new());
        let cart_items = Arc::new(InMemoryCartItemRepository::new());
        let orders = Arc::new(InMemoryOrderRepository::new());

        let services = Services::new(
            users,
            apiaries.clone(),
            hives,
            products,
            cart_items,
            orders.clone(),
        );

        let recorder = Arc::new(RecordingSubscriber::new());
        services.hub.subscribe(recorder.clone());

        Self {
            services,
            apiaries,
            orders,
            recorder,
        }
    }

    /// Creates a beekeeper-owned apiary with one product of the given price
    /// and stock, returning (owner, product id).
    async fn stocked_product(&self, price_cents: i64, stock: u32) -> (UserId, common::ProductId) {
        let owner = UserId::new();
        let apiary = self
            .services
            .apiaries
            .create_apiary("Meadow", "Hillside", owner)
            .await
            .unwrap();
        let product = self
            .services
            .products
            .create_product(
                apiary.id(),
                None,
                "Wildflower Honey",
                "500g jar",
                Money::from_cents(price_cents),
                stock,
                owner,
            )
            .await
            .unwrap();
        (owner, product.id())
    }
}

#[tokio::test]
async fn cascading_delete_publishes_dependents_first() {
    let h = TestHarness::new();
    let owner = UserId::new();
    let apiary = h
        .services
        .apiaries
        .create_apiary("Meadow", "Hillside", owner)
        .await
        .unwrap();

    let hive1 = h
        .services
        .hives
        .create_hive(apiary.id(), 1, 2022, owner)
        .await
        .unwrap();
    let hive2 = h
        .services
        .hives
        .create_hive(apiary.id(), 2, 2023, owner)
        .await
        .unwrap();

    // Five products total: two per hive, one directly under the apiary.
    for (hive, name) in [
        (Some(hive1.id()), "Acacia"),
        (Some(hive1.id()), "Linden"),
        (Some(hive2.id()), "Buckwheat"),
        (Some(hive2.id()), "Chestnut"),
        (None, "Wildflower"),
    ] {
        h.services
            .products
            .create_product(apiary.id(), hive, name, "jar", Money::from_cents(1000), 5, owner)
            .await
            .unwrap();
    }

    h.recorder.clear();
    h.services
        .apiaries
        .delete_apiary(apiary.id(), owner)
        .await
        .unwrap();

    let kinds = h.recorder.kinds();
    assert_eq!(
        kinds,
        vec![
            ("Product", ChangeKind::Deleted),
            ("Product", ChangeKind::Deleted),
            ("Hive", ChangeKind::Deleted),
            ("Product", ChangeKind::Deleted),
            ("Product", ChangeKind::Deleted),
            ("Hive", ChangeKind::Deleted),
            ("Product", ChangeKind::Deleted),
            ("Apiary", ChangeKind::Deleted),
        ]
    );

    assert!(h.services.apiaries.find_by_id(apiary.id()).await.is_none());
    assert!(h.services.hives.find_by_apiary(apiary.id()).await.is_empty());
    assert!(h.services.products.find_by_apiary(apiary.id()).await.is_empty());
}

#[tokio::test]
async fn checkout_merges_cart_lines_and_adjusts_stock() {
    let h = TestHarness::new();
    let (_, product_id) = h.stocked_product(1250, 10).await;
    let client = UserId::new();

    h.services.carts.add_to_cart(client, product_id, 3).await.unwrap();
    h.services.carts.add_to_cart(client, product_id, 4).await.unwrap();

    let lines = h.services.carts.cart_items(client).await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity(), 7);
    assert_eq!(
        h.services.carts.calculate_cart_total(client).await,
        Money::from_cents(8750)
    );

    let order = h.services.carts.checkout(client).await.unwrap();
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.total(), Money::from_cents(8750));
    assert_eq!(order.items().len(), 1);
    assert_eq!(order.items()[0].quantity, 7);
    assert_eq!(order.items()[0].unit_price, Money::from_cents(1250));

    let product = h.services.products.find_by_id(product_id).await.unwrap();
    assert_eq!(product.quantity(), 3);
    assert!(h.services.carts.cart_items(client).await.is_empty());
}

#[tokio::test]
async fn checkout_is_all_or_nothing() {
    let h = TestHarness::new();
    let (owner, plenty) = h.stocked_product(1000, 5).await;
    let scarce = h
        .services
        .products
        .create_product(
            h.services.apiaries.find_by_beekeeper(owner).await[0].id(),
            None,
            "Rare Honeydew",
            "tiny jar",
            Money::from_cents(3000),
            2,
            owner,
        )
        .await
        .unwrap();

    let client = UserId::new();
    h.services.carts.add_to_cart(client, plenty, 3).await.unwrap();
    h.services.carts.add_to_cart(client, scarce.id(), 2).await.unwrap();

    // Stock drops below the carted quantity between add and checkout.
    h.services
        .products
        .update_product(scarce.id(), "Rare Honeydew", "tiny jar", Money::from_cents(3000), 1, owner)
        .await
        .unwrap();

    let err = h.services.carts.checkout(client).await.unwrap_err();
    match err {
        ServiceError::InsufficientStock {
            product_id,
            requested,
            available,
        } => {
            assert_eq!(product_id, scarce.id());
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
        }
        other => panic!("expected InsufficientStock, got {other}"),
    }

    // No order, no stock movement, cart intact.
    assert_eq!(h.orders.len().await, 0);
    assert_eq!(h.services.products.find_by_id(plenty).await.unwrap().quantity(), 5);
    assert_eq!(h.services.products.find_by_id(scarce.id()).await.unwrap().quantity(), 1);
    assert_eq!(h.services.carts.cart_items(client).await.len(), 2);
}

#[tokio::test]
async fn cancellation_restores_stock_exactly_once() {
    let h = TestHarness::new();
    let (_, product_id) = h.stocked_product(900, 10).await;
    let client = UserId::new();

    h.services.carts.add_to_cart(client, product_id, 7).await.unwrap();
    let order = h.services.carts.checkout(client).await.unwrap();
    assert_eq!(h.services.products.find_by_id(product_id).await.unwrap().quantity(), 3);

    let canceled = h
        .services
        .orders
        .cancel_order(order.id(), client)
        .await
        .unwrap();
    assert_eq!(canceled.status(), OrderStatus::Canceled);
    assert_eq!(h.services.products.find_by_id(product_id).await.unwrap().quantity(), 10);

    // A second cancellation must fail and must not double-restore.
    let err = h
        .services
        .orders
        .cancel_order(order.id(), client)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidStateTransition {
            from: OrderStatus::Canceled,
            ..
        }
    ));
    assert_eq!(h.services.products.find_by_id(product_id).await.unwrap().quantity(), 10);
}

#[tokio::test]
async fn cancellation_is_refused_for_other_clients() {
    let h = TestHarness::new();
    let (_, product_id) = h.stocked_product(900, 5).await;
    let client = UserId::new();

    h.services.carts.add_to_cart(client, product_id, 2).await.unwrap();
    let order = h.services.carts.checkout(client).await.unwrap();

    let err = h
        .services
        .orders
        .cancel_order(order.id(), UserId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Ownership));
    assert_eq!(
        h.services.orders.find_by_id(order.id()).await.unwrap().status(),
        OrderStatus::Pending
    );
}

#[tokio::test]
async fn foreign_beekeeper_cannot_update_an_apiary() {
    let h = TestHarness::new();
    let owner = UserId::new();
    let apiary = h
        .services
        .apiaries
        .create_apiary("Meadow", "Hillside", owner)
        .await
        .unwrap();

    let err = h
        .services
        .apiaries
        .update_apiary(apiary.id(), "Hijacked", "Elsewhere", UserId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Ownership));

    let stored = h.services.apiaries.find_by_id(apiary.id()).await.unwrap();
    assert_eq!(stored.name, "Meadow");
    assert_eq!(stored.location, "Hillside");
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_checkouts_cannot_oversell() {
    let h = TestHarness::new();
    let (_, product_id) = h.stocked_product(1000, 10).await;

    let first = UserId::new();
    let second = UserId::new();
    h.services.carts.add_to_cart(first, product_id, 6).await.unwrap();
    h.services.carts.add_to_cart(second, product_id, 6).await.unwrap();

    let services = Arc::new(h.services);
    let a = {
        let services = services.clone();
        tokio::spawn(async move { services.carts.checkout(first).await })
    };
    let b = {
        let services = services.clone();
        tokio::spawn(async move { services.carts.checkout(second).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one checkout must win");
    assert!(results.iter().any(|r| matches!(
        r,
        Err(ServiceError::InsufficientStock { available: 4, .. })
    )));

    let product = services.products.find_by_id(product_id).await.unwrap();
    assert_eq!(product.quantity(), 4);
}

#[tokio::test]
async fn empty_cart_checkout_is_rejected() {
    let h = TestHarness::new();
    let err = h.services.carts.checkout(UserId::new()).await.unwrap_err();
    assert!(matches!(err, ServiceError::EmptyCart));
}

#[tokio::test]
async fn cart_guards_quantity_stock_and_ownership() {
    let h = TestHarness::new();
    let (_, product_id) = h.stocked_product(1000, 3).await;
    let client = UserId::new();

    assert!(matches!(
        h.services.carts.add_to_cart(client, product_id, 0).await,
        Err(ServiceError::Validation(_))
    ));
    assert!(matches!(
        h.services.carts.add_to_cart(client, product_id, 4).await,
        Err(ServiceError::InsufficientStock { .. })
    ));

    let line = h.services.carts.add_to_cart(client, product_id, 2).await.unwrap();
    // Merging past current stock is also rejected.
    assert!(matches!(
        h.services.carts.add_to_cart(client, product_id, 2).await,
        Err(ServiceError::InsufficientStock { requested: 4, available: 3, .. })
    ));

    let err = h
        .services
        .carts
        .remove_from_cart(UserId::new(), line.id())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Ownership));

    h.services.carts.remove_from_cart(client, line.id()).await.unwrap();
    assert!(h.services.carts.cart_items(client).await.is_empty());
}

#[tokio::test]
async fn order_lifecycle_moves_forward_only() {
    let h = TestHarness::new();
    let (_, product_id) = h.stocked_product(2000, 5).await;
    let client = UserId::new();

    h.services.carts.add_to_cart(client, product_id, 1).await.unwrap();
    let order = h.services.carts.checkout(client).await.unwrap();

    let paid = h.services.orders.mark_paid(order.id()).await.unwrap();
    assert_eq!(paid.status(), OrderStatus::Paid);

    // A paid order can no longer be canceled, and stock stays put.
    let err = h
        .services
        .orders
        .cancel_order(order.id(), client)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidStateTransition { .. }));
    assert_eq!(h.services.products.find_by_id(product_id).await.unwrap().quantity(), 4);

    let delivered = h.services.orders.mark_delivered(order.id()).await.unwrap();
    assert_eq!(delivered.status(), OrderStatus::Delivered);

    assert!(h.services.orders.mark_paid(order.id()).await.is_err());
    assert!(h.services.orders.mark_delivered(order.id()).await.is_err());
}

#[tokio::test]
async fn beekeeper_order_queries_are_scoped_and_filtered() {
    let h = TestHarness::new();
    let (owner, product_id) = h.stocked_product(1500, 10).await;
    let (other_owner, _) = h.stocked_product(1000, 10).await;
    let client = UserId::new();

    h.services.carts.add_to_cart(client, product_id, 2).await.unwrap();
    let order = h.services.carts.checkout(client).await.unwrap();

    let visible = h.services.orders.find_orders_for_beekeeper(owner).await;
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id(), order.id());
    assert!(h.services.orders.find_orders_for_beekeeper(other_owner).await.is_empty());

    let hour = chrono::Duration::hours(1);
    let now = chrono::Utc::now();

    let in_window = h
        .services
        .orders
        .find_orders_with_filters(owner, Some(OrderStatus::Pending), now - hour, now + hour)
        .await;
    assert_eq!(in_window.len(), 1);

    let wrong_status = h
        .services
        .orders
        .find_orders_with_filters(owner, Some(OrderStatus::Canceled), now - hour, now + hour)
        .await;
    assert!(wrong_status.is_empty());

    let outside_window = h
        .services
        .orders
        .find_orders_with_filters(owner, None, now + hour, now + hour + hour)
        .await;
    assert!(outside_window.is_empty());

    let mine = h.services.orders.find_by_client(client).await;
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn registration_and_authentication_flow() {
    let h = TestHarness::new();
    let profile = Profile {
        full_name: Some("Anna Fields".to_string()),
        email: Some("anna@example.com".to_string()),
        ..Profile::default()
    };

    let user = h
        .services
        .users
        .register_client("anna", "sweet clover", profile)
        .await
        .unwrap();
    assert!(!user.is_beekeeper());

    assert!(matches!(
        h.services.users.register_client("anna", "another pass", Profile::default()).await,
        Err(ServiceError::UsernameTaken(_))
    ));
    assert!(matches!(
        h.services.users.register_client("short", "2short", Profile::default()).await,
        Err(ServiceError::Validation(_))
    ));

    assert!(h.services.users.authenticate("anna", "sweet clover").await);
    assert!(!h.services.users.authenticate("anna", "wrong").await);
    assert!(!h.services.users.authenticate("nobody", "sweet clover").await);

    h.services
        .users
        .change_password("anna", "sweet clover", "even sweeter")
        .await
        .unwrap();
    assert!(!h.services.users.authenticate("anna", "sweet clover").await);
    assert!(h.services.users.authenticate("anna", "even sweeter").await);

    let mut profile = h.services.users.find_by_username("anna").await.unwrap().profile;
    profile.address = Some("12 Orchard Lane".to_string());
    let updated = h
        .services
        .users
        .update_profile(user.id(), profile)
        .await
        .unwrap();
    assert_eq!(updated.username(), "anna");
    assert_eq!(updated.profile.address.as_deref(), Some("12 Orchard Lane"));
}

#[tokio::test]
async fn storage_faults_degrade_reads_and_fail_mutations() {
    let h = TestHarness::new();
    let owner = UserId::new();
    h.services
        .apiaries
        .create_apiary("Meadow", "Hillside", owner)
        .await
        .unwrap();

    h.apiaries.set_fail(true);
    assert!(matches!(
        h.services.apiaries.create_apiary("North", "Ridge", owner).await,
        Err(ServiceError::Store(_))
    ));
    // Reads never fail the caller; they degrade to empty.
    assert!(h.services.apiaries.find_by_beekeeper(owner).await.is_empty());
    assert!(h.services.apiaries.find_all().await.is_empty());

    h.apiaries.set_fail(false);
    assert_eq!(h.services.apiaries.find_by_beekeeper(owner).await.len(), 1);
}

#[tokio::test]
async fn update_events_carry_old_and_new_snapshots() {
    let h = TestHarness::new();
    let owner = UserId::new();
    let apiary = h
        .services
        .apiaries
        .create_apiary("Meadow", "Hillside", owner)
        .await
        .unwrap();

    h.recorder.clear();
    h.services
        .apiaries
        .update_apiary(apiary.id(), "Meadow", "Valley", owner)
        .await
        .unwrap();

    let events = h.recorder.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        notify::EntityChange::Apiary(notify::Change::Updated { old, new }) => {
            assert_eq!(old.location, "Hillside");
            assert_eq!(new.location, "Valley");
        }
        other => panic!("expected an apiary update event, got {other:?}"),
    }
}

#[tokio::test]
async fn merged_cart_quantity_cannot_overflow() {
    let h = TestHarness::new();
    let (_, product_id) = h.stocked_product(1000, u32::MAX).await;
    let client = UserId::new();

    h.services
        .carts
        .add_to_cart(client, product_id, u32::MAX)
        .await
        .unwrap();

    // Merging one more unit would wrap past u32::MAX; the line must be
    // refused, not wrapped into a tiny quantity that passes the stock check.
    let err = h
        .services
        .carts
        .add_to_cart(client, product_id, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock { .. }));

    let lines = h.services.carts.cart_items(client).await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity(), u32::MAX);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_cancel_and_payment_cannot_both_win() {
    let h = TestHarness::new();
    let (_, product_id) = h.stocked_product(1000, 10).await;
    let client = UserId::new();

    h.services.carts.add_to_cart(client, product_id, 4).await.unwrap();
    let order = h.services.carts.checkout(client).await.unwrap();

    let services = Arc::new(h.services);
    let order_id = order.id();
    let cancel = {
        let services = services.clone();
        tokio::spawn(async move { services.orders.cancel_order(order_id, client).await })
    };
    let pay = {
        let services = services.clone();
        tokio::spawn(async move { services.orders.mark_paid(order_id).await })
    };

    let results = [cancel.await.unwrap(), pay.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one transition must win");

    // Whichever lost must have observed the winner's status write, so the
    // final order and stock agree: Canceled means restored, Paid means not.
    let settled = services.orders.find_by_id(order_id).await.unwrap();
    let stock = services.products.find_by_id(product_id).await.unwrap().quantity();
    match settled.status() {
        OrderStatus::Canceled => assert_eq!(stock, 10),
        OrderStatus::Paid => assert_eq!(stock, 6),
        other => panic!("unexpected settled status {other}"),
    }
}

#[tokio::test]
async fn dashboard_queries_cover_catalog_and_counts() {
    let h = TestHarness::new();
    let owner = UserId::new();
    let meadow = h
        .services
        .apiaries
        .create_apiary("Meadow", "Hillside", owner)
        .await
        .unwrap();
    let ridge = h
        .services
        .apiaries
        .create_apiary("North", "Ridge", owner)
        .await
        .unwrap();
    let neighbor = UserId::new();
    h.services
        .apiaries
        .create_apiary("South", "Hillside", neighbor)
        .await
        .unwrap();

    let hive = h
        .services
        .hives
        .create_hive(meadow.id(), 1, 2023, owner)
        .await
        .unwrap();

    let cheap = h
        .services
        .products
        .create_product(meadow.id(), Some(hive.id()), "Acacia", "jar", Money::from_cents(1000), 5, owner)
        .await
        .unwrap();
    h.services
        .products
        .create_product(meadow.id(), None, "Linden", "jar", Money::from_cents(3000), 0, owner)
        .await
        .unwrap();
    let dear = h
        .services
        .products
        .create_product(ridge.id(), None, "Buckwheat", "jar", Money::from_cents(5000), 2, owner)
        .await
        .unwrap();

    // Locations are distinct and sorted; the duplicate Hillside collapses.
    assert_eq!(
        h.services.apiaries.find_all_locations().await,
        vec!["Hillside".to_string(), "Ridge".to_string()]
    );

    // The sold-out Linden never reaches the client catalog.
    let available = h.services.products.find_available().await;
    assert_eq!(available.len(), 2);
    assert!(available.iter().all(|p| p.quantity() > 0));

    let pricey = h.services.products.find_by_price_range(Some(Money::from_cents(2000)), None).await;
    assert_eq!(pricey.len(), 1);
    assert_eq!(pricey[0].id(), dear.id());
    let budget = h
        .services
        .products
        .find_by_price_range(None, Some(Money::from_cents(2000)))
        .await;
    assert_eq!(budget.len(), 1);
    assert_eq!(budget[0].id(), cheap.id());

    assert_eq!(h.services.products.count_by_apiary(meadow.id()).await, 2);
    assert_eq!(h.services.products.count_by_hive(hive.id()).await, 1);
    assert_eq!(h.services.hives.count_by_apiary(meadow.id()).await, 1);
    assert_eq!(h.services.hives.count_by_apiary(ridge.id()).await, 0);
}

#[tokio::test]
async fn clearing_a_cart_publishes_one_deletion_per_line() {
    let h = TestHarness::new();
    let (owner, first) = h.stocked_product(1000, 5).await;
    let second = h
        .services
        .products
        .create_product(
            h.services.apiaries.find_by_beekeeper(owner).await[0].id(),
            None,
            "Linden",
            "jar",
            Money::from_cents(2000),
            5,
            owner,
        )
        .await
        .unwrap();

    let client = UserId::new();
    h.services.carts.add_to_cart(client, first, 2).await.unwrap();
    h.services.carts.add_to_cart(client, second.id(), 1).await.unwrap();

    h.recorder.clear();
    h.services.carts.clear_cart(client).await.unwrap();

    assert!(h.services.carts.cart_items(client).await.is_empty());
    assert_eq!(
        h.recorder.kinds(),
        vec![
            ("CartItem", ChangeKind::Deleted),
            ("CartItem", ChangeKind::Deleted),
        ]
    );
}
