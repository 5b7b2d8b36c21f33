//! Order lifecycle tests: cart conversion, price snapshots, all-or-nothing creation, cancellation,
//! and the status transition graph.

mod support;

use storefront_common::Cents;
use storefront_engine::{
    db_types::{CartItem, NewOrder, OrderStatus, ReservationStatus, Variant},
    events::EventProducers,
    helpers::order_correlation_key,
    order_objects::OrderQueryFilter,
    InventoryApi,
    OrderFlowApi,
    StorefrontError,
};

fn alice_cart(items: Vec<CartItem>) -> NewOrder {
    NewOrder::new("alice@example.com", "Alice", items)
}

#[tokio::test]
async fn a_cart_becomes_a_priced_pending_order() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "hoodie-l", "Hoodie (L)", 10_000, 5).await;
    support::seed_variant(&db, "cap", "Cap", 20_000, 5).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let cart = alice_cart(vec![CartItem::new("hoodie-l", 2), CartItem::new("cap", 1)]);
    let result = api.create_order(cart).await.unwrap();

    assert_eq!(result.order.status, OrderStatus::Pending);
    assert_eq!(result.order.customer_email, "alice@example.com");
    assert_eq!(result.order.total_cents, Cents::from(40_000));
    assert_eq!(result.line_count(), 2);
    assert_eq!(result.subtotal(), result.order.total_cents);

    let hoodie = result.items.iter().find(|i| i.variant_id == "hoodie-l").unwrap();
    assert_eq!(hoodie.quantity, 2);
    assert_eq!(hoodie.product_name, "Hoodie (L)");
    assert_eq!(hoodie.unit_price_cents, Cents::from(10_000));
    assert_eq!(hoodie.line_total_cents, Cents::from(20_000));

    // Every line is held under the order's correlation key.
    let inventory = InventoryApi::new(db);
    let key = order_correlation_key(result.order.id);
    let holds = inventory.active_reservations(&key).await.unwrap();
    assert_eq!(holds.len(), 2);
    let stock = inventory.stock("hoodie-l").await.unwrap();
    assert_eq!(stock.quantity_on_hand, 5);
    assert_eq!(stock.quantity_reserved, 2);
}

#[tokio::test]
async fn order_snapshots_survive_catalog_changes() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "cap", "Cap", 2_000, 5).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let result = api.create_order(alice_cart(vec![CartItem::new("cap", 2)])).await.unwrap();
    assert_eq!(result.order.total_cents, Cents::from(4_000));

    // Reprice and rename the variant after the fact.
    let inventory = InventoryApi::new(db);
    let repriced = Variant {
        variant_id: "cap".to_string(),
        product_name: "Cap (new edition)".to_string(),
        sku: "SKU-CAP-2".to_string(),
        price_cents: Cents::from(9_999),
    };
    inventory.upsert_variant(&repriced).await.unwrap();

    let items = api.order_items(result.order.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_name, "Cap");
    assert_eq!(items[0].unit_price_cents, Cents::from(2_000));
    let order = api.order(result.order.id).await.unwrap().unwrap();
    assert_eq!(order.total_cents, Cents::from(4_000));
}

#[tokio::test]
async fn order_creation_is_all_or_nothing() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "hoodie-l", "Hoodie (L)", 10_000, 5).await;
    support::seed_variant(&db, "rare-cap", "Rare cap", 20_000, 0).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let cart = alice_cart(vec![CartItem::new("hoodie-l", 1), CartItem::new("rare-cap", 1)]);
    let err = api.create_order(cart).await.unwrap_err();
    match err {
        StorefrontError::InsufficientStock { variant_id, requested, available } => {
            assert_eq!(variant_id, "rare-cap");
            assert_eq!(requested, 1);
            assert_eq!(available, 0);
        },
        e => panic!("Unexpected error: {e}"),
    }
    // The first line's hold rolled back with the rest.
    let inventory = InventoryApi::new(db);
    let stock = inventory.stock("hoodie-l").await.unwrap();
    assert_eq!(stock.quantity_reserved, 0);
    let orders = api.list_orders(OrderQueryFilter::default()).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn empty_carts_are_rejected() {
    let db = support::new_test_db().await;
    let api = OrderFlowApi::new(db, EventProducers::default());
    let err = api.create_order(alice_cart(vec![])).await.unwrap_err();
    assert!(matches!(err, StorefrontError::EmptyCart));
}

#[tokio::test]
async fn carts_with_non_positive_quantities_are_rejected() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "cap", "Cap", 2_000, 5).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let cart = alice_cart(vec![CartItem::new("cap", 1), CartItem::new("cap", 0)]);
    let err = api.create_order(cart).await.unwrap_err();
    assert!(matches!(err, StorefrontError::InvalidQuantity(0)));
    // Nothing was written for the valid line either.
    let inventory = InventoryApi::new(db);
    let stock = inventory.stock("cap").await.unwrap();
    assert_eq!(stock.quantity_reserved, 0);
    assert!(api.list_orders(OrderQueryFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_variants_are_rejected() {
    let db = support::new_test_db().await;
    let api = OrderFlowApi::new(db, EventProducers::default());
    let cart = alice_cart(vec![CartItem::new("no-such-variant", 1)]);
    let err = api.create_order(cart).await.unwrap_err();
    assert!(matches!(err, StorefrontError::VariantNotFound(v) if v == "no-such-variant"));
}

#[tokio::test]
async fn cancelling_a_pending_order_releases_its_holds() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "hoodie-l", "Hoodie (L)", 10_000, 5).await;
    support::seed_variant(&db, "cap", "Cap", 2_000, 3).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let cart = alice_cart(vec![CartItem::new("hoodie-l", 2), CartItem::new("cap", 3)]);
    let result = api.create_order(cart).await.unwrap();
    let key = order_correlation_key(result.order.id);
    let inventory = InventoryApi::new(db);
    let holds = inventory.active_reservations(&key).await.unwrap();
    assert_eq!(holds.len(), 2);

    let order = api.transition_order(result.order.id, OrderStatus::Cancelled).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);

    for variant_id in ["hoodie-l", "cap"] {
        let stock = inventory.stock(variant_id).await.unwrap();
        assert_eq!(stock.quantity_reserved, 0, "{variant_id} still holds reserved stock");
    }
    assert!(inventory.active_reservations(&key).await.unwrap().is_empty());
    // The order's holds are terminally cancelled, not expired or fulfilled.
    for hold in holds {
        let hold = inventory.reservation(hold.id).await.unwrap().unwrap();
        assert_eq!(hold.status, ReservationStatus::Cancelled);
    }

    // Terminal: no way out of cancelled.
    let err = api.transition_order(result.order.id, OrderStatus::Paid).await.unwrap_err();
    assert!(matches!(err, StorefrontError::IllegalTransition { .. }));
}

#[tokio::test]
async fn the_transition_graph_is_enforced() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "cap", "Cap", 2_000, 5).await;
    let api = OrderFlowApi::new(db, EventProducers::default());
    let result = api.create_order(alice_cart(vec![CartItem::new("cap", 1)])).await.unwrap();
    let id = result.order.id;

    // Pending orders cannot jump straight to shipped.
    let err = api.transition_order(id, OrderStatus::Shipped).await.unwrap_err();
    match err {
        StorefrontError::IllegalTransition { from, to, allowed } => {
            assert_eq!(from, OrderStatus::Pending);
            assert_eq!(to, OrderStatus::Shipped);
            assert_eq!(allowed, "paid, cancelled");
        },
        e => panic!("Unexpected error: {e}"),
    }

    // The happy path walks the graph one edge at a time.
    api.transition_order(id, OrderStatus::Paid).await.unwrap();
    api.transition_order(id, OrderStatus::Processing).await.unwrap();
    api.transition_order(id, OrderStatus::Shipped).await.unwrap();
    let order = api.transition_order(id, OrderStatus::Delivered).await.unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);

    // Delivered orders can only be refunded.
    let err = api.transition_order(id, OrderStatus::Cancelled).await.unwrap_err();
    assert!(matches!(err, StorefrontError::IllegalTransition { .. }));
    let order = api.transition_order(id, OrderStatus::Refunded).await.unwrap();
    assert_eq!(order.status, OrderStatus::Refunded);
}

#[tokio::test]
async fn transitioning_a_missing_order_fails() {
    let db = support::new_test_db().await;
    let api = OrderFlowApi::new(db, EventProducers::default());
    let err = api.transition_order(999.into(), OrderStatus::Paid).await.unwrap_err();
    assert!(matches!(err, StorefrontError::OrderNotFound(id) if id.value() == 999));
}

#[tokio::test]
async fn listings_filter_by_customer_and_status() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "cap", "Cap", 2_000, 10).await;
    let api = OrderFlowApi::new(db, EventProducers::default());
    let a = api.create_order(alice_cart(vec![CartItem::new("cap", 1)])).await.unwrap();
    let bob = NewOrder::new("bob@example.com", "Bob", vec![CartItem::new("cap", 2)]);
    let b = api.create_order(bob).await.unwrap();
    api.transition_order(b.order.id, OrderStatus::Cancelled).await.unwrap();

    let all = api.list_orders(OrderQueryFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let alices = api
        .list_orders(OrderQueryFilter::default().with_customer_email("alice@example.com"))
        .await
        .unwrap();
    assert_eq!(alices.len(), 1);
    assert_eq!(alices[0].id, a.order.id);

    let cancelled = api
        .list_orders(OrderQueryFilter::default().with_status(OrderStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, b.order.id);

    let none = api
        .list_orders(
            OrderQueryFilter::default()
                .with_customer_email("alice@example.com")
                .with_status(OrderStatus::Cancelled),
        )
        .await
        .unwrap();
    assert!(none.is_empty());
}
