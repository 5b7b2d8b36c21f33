//! Payment reconciliation tests: at-least-once confirmation delivery must result in exactly-once
//! fulfilment.

mod support;

use std::{
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use storefront_engine::{
    db_types::{CartItem, NewOrder, OrderId, OrderStatus, ReservationStatus},
    events::{EventHandlers, EventHooks, EventProducers},
    InventoryApi,
    OrderFlowApi,
    OrderManagement,
    SqliteDatabase,
};

async fn checkout(db: &SqliteDatabase, session_id: &str) -> OrderId {
    support::seed_variant(db, "hoodie-l", "Hoodie (L)", 10_000, 10).await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let cart = NewOrder::new("alice@example.com", "Alice", vec![CartItem::new("hoodie-l", 2)]);
    let result = api.create_order(cart).await.unwrap();
    let order = api.attach_payment_session(result.order.id, session_id).await.unwrap();
    assert_eq!(order.payment_session_id.as_deref(), Some(session_id));
    order.id
}

#[tokio::test]
async fn a_confirmation_fulfills_the_order_exactly_once() {
    let db = support::new_test_db().await;
    let id = checkout(&db, "cs_test_123").await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());

    let first = api.fulfill_by_payment_session("cs_test_123").await.unwrap().unwrap();
    assert!(first.newly_paid);
    assert_eq!(first.order.id, id);
    assert_eq!(first.order.status, OrderStatus::Paid);
    assert_eq!(first.fulfilled.len(), 1);
    assert_eq!(first.fulfilled[0].quantity, 2);

    let inventory = InventoryApi::new(db);
    let stock = inventory.stock("hoodie-l").await.unwrap();
    assert_eq!(stock.quantity_on_hand, 8);
    assert_eq!(stock.quantity_reserved, 0);
    let hold = inventory.reservation(first.fulfilled[0].id).await.unwrap().unwrap();
    assert_eq!(hold.status, ReservationStatus::Fulfilled);

    // The provider redelivers the same confirmation. Nothing moves.
    let second = api.fulfill_by_payment_session("cs_test_123").await.unwrap().unwrap();
    assert!(!second.newly_paid);
    assert!(second.fulfilled.is_empty());
    assert_eq!(second.order.status, OrderStatus::Paid);
    let stock = inventory.stock("hoodie-l").await.unwrap();
    assert_eq!(stock.quantity_on_hand, 8);
    assert_eq!(stock.quantity_reserved, 0);
}

#[tokio::test]
async fn unknown_sessions_are_retryable() {
    let db = support::new_test_db().await;
    let api = OrderFlowApi::new(db, EventProducers::default());
    let result = api.fulfill_by_payment_session("cs_never_seen").await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn orders_can_be_found_by_session() {
    let db = support::new_test_db().await;
    let id = checkout(&db, "cs_lookup").await;
    let order = db.order_by_payment_session("cs_lookup").await.unwrap().unwrap();
    assert_eq!(order.id, id);
    assert!(db.order_by_payment_session("cs_other").await.unwrap().is_none());
}

#[tokio::test]
async fn the_order_paid_hook_fires_once_per_order() {
    let db = support::new_test_db().await;
    let id = checkout(&db, "cs_hooked").await;

    let count = Arc::new(AtomicUsize::new(0));
    let c2 = Arc::clone(&count);
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(move |event| {
        let count = Arc::clone(&c2);
        Box::pin(async move {
            assert_eq!(event.fulfilled.len(), 1);
            count.fetch_add(1, Ordering::SeqCst);
        }) as Pin<Box<dyn std::future::Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let api = OrderFlowApi::new(db, producers);
    let first = api.fulfill_by_payment_session("cs_hooked").await.unwrap().unwrap();
    assert!(first.newly_paid);
    assert_eq!(first.order.id, id);
    // Redelivery must not re-fire the hook.
    api.fulfill_by_payment_session("cs_hooked").await.unwrap().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn paid_orders_move_through_fulfilment_without_touching_stock() {
    let db = support::new_test_db().await;
    checkout(&db, "cs_flow").await;
    let api = OrderFlowApi::new(db.clone(), EventProducers::default());
    let paid = api.fulfill_by_payment_session("cs_flow").await.unwrap().unwrap();
    let id = paid.order.id;

    let inventory = InventoryApi::new(db);
    let before = inventory.stock("hoodie-l").await.unwrap();
    api.transition_order(id, OrderStatus::Processing).await.unwrap();
    api.transition_order(id, OrderStatus::Shipped).await.unwrap();
    api.transition_order(id, OrderStatus::Delivered).await.unwrap();
    let after = inventory.stock("hoodie-l").await.unwrap();
    assert_eq!(before.quantity_on_hand, after.quantity_on_hand);
    assert_eq!(before.quantity_reserved, after.quantity_reserved);
}
