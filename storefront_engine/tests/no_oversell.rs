//! Concurrency tests for the reservation protocol: many buyers racing for scarce stock must never
//! push the reserved quantity past what is physically on hand.

mod support;

use chrono::Duration;
use storefront_engine::{InventoryApi, StorefrontDatabase, StorefrontError};

#[tokio::test]
async fn racing_buyers_cannot_oversell() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "tee-m", "Tee (M)", 1_500, 3).await;
    let mut handles = Vec::with_capacity(10);
    for i in 0..10 {
        let db = db.clone();
        let cart_id = format!("cart-{i}");
        handles.push(tokio::spawn(async move {
            db.reserve("tee-m", 1, &cart_id, Duration::minutes(5)).await
        }));
    }
    let mut won = 0;
    let mut lost = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(reservation) => {
                assert_eq!(reservation.quantity, 1);
                won += 1;
            },
            Err(StorefrontError::InsufficientStock { variant_id, requested, available }) => {
                assert_eq!(variant_id, "tee-m");
                assert_eq!(requested, 1);
                assert!(available < 1, "loser saw available = {available}");
                lost += 1;
            },
            Err(e) => panic!("Unexpected error from reserve: {e}"),
        }
    }
    assert_eq!(won, 3);
    assert_eq!(lost, 7);
    let api = InventoryApi::new(db);
    let stock = api.stock("tee-m").await.unwrap();
    assert_eq!(stock.quantity_on_hand, 3);
    assert_eq!(stock.quantity_reserved, 3);
    assert_eq!(stock.available(), 0);
}

#[tokio::test]
async fn two_racers_for_the_last_unit() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "poster", "Poster", 900, 1).await;
    let (a, b) = tokio::join!(
        {
            let db = db.clone();
            async move { db.reserve("poster", 1, "cart-a", Duration::minutes(5)).await }
        },
        {
            let db = db.clone();
            async move { db.reserve("poster", 1, "cart-b", Duration::minutes(5)).await }
        }
    );
    assert!(
        a.is_ok() != b.is_ok(),
        "exactly one racer must win (a: {}, b: {})",
        a.is_ok(),
        b.is_ok()
    );
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(loser, Err(StorefrontError::InsufficientStock { .. })));
    let api = InventoryApi::new(db);
    let stock = api.stock("poster").await.unwrap();
    assert_eq!(stock.quantity_on_hand, 1);
    assert_eq!(stock.quantity_reserved, 1);
}

#[tokio::test]
async fn reserving_more_than_available_fails_cleanly() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "mug", "Mug", 1_200, 4).await;
    let api = InventoryApi::new(db);
    let err = api.reserve("mug", 5, "cart-greedy").await.unwrap_err();
    match err {
        StorefrontError::InsufficientStock { requested, available, .. } => {
            assert_eq!(requested, 5);
            assert_eq!(available, 4);
        },
        e => panic!("Unexpected error: {e}"),
    }
    // The failed attempt left no partial hold behind.
    let stock = api.stock("mug").await.unwrap();
    assert_eq!(stock.quantity_reserved, 0);
    assert!(api.active_reservations("cart-greedy").await.unwrap().is_empty());
}

#[tokio::test]
async fn cancelling_a_hold_returns_it_to_availability() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "tote", "Tote bag", 2_500, 2).await;
    let api = InventoryApi::new(db);
    let held = api.reserve("tote", 2, "cart-a").await.unwrap();
    // All stock is spoken for.
    let err = api.reserve("tote", 1, "cart-b").await.unwrap_err();
    assert!(matches!(err, StorefrontError::InsufficientStock { available: 0, .. }));
    api.cancel_reservation(held.id).await.unwrap();
    let stock = api.stock("tote").await.unwrap();
    assert_eq!(stock.quantity_on_hand, 2);
    assert_eq!(stock.quantity_reserved, 0);
    // And a cancelled hold cannot be cancelled or fulfilled again.
    let err = api.cancel_reservation(held.id).await.unwrap_err();
    assert!(matches!(err, StorefrontError::ReservationNotActive { .. }));
    let err = api.fulfill_reservation(held.id).await.unwrap_err();
    assert!(matches!(err, StorefrontError::ReservationNotActive { .. }));
}

#[tokio::test]
async fn fulfilling_a_hold_deducts_physical_stock() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "print", "Art print", 5_000, 10).await;
    let api = InventoryApi::new(db);
    let held = api.reserve("print", 3, "cart-a").await.unwrap();
    let fulfilled = api.fulfill_reservation(held.id).await.unwrap();
    assert_eq!(fulfilled.quantity, 3);
    let stock = api.stock("print").await.unwrap();
    assert_eq!(stock.quantity_on_hand, 7);
    assert_eq!(stock.quantity_reserved, 0);
    assert_eq!(stock.available(), 7);
}

#[tokio::test]
async fn non_positive_quantities_are_rejected() {
    let db = support::new_test_db().await;
    support::seed_variant(&db, "mug", "Mug", 1_200, 4).await;
    let api = InventoryApi::new(db);
    for quantity in [0, -2] {
        let err = api.reserve("mug", quantity, "cart-a").await.unwrap_err();
        assert!(matches!(err, StorefrontError::InvalidQuantity(q) if q == quantity));
    }
    let stock = api.stock("mug").await.unwrap();
    assert_eq!(stock.quantity_reserved, 0);
    assert!(api.active_reservations("cart-a").await.unwrap().is_empty());
}

#[tokio::test]
async fn fulfilling_an_unknown_hold_fails() {
    let db = support::new_test_db().await;
    let api = InventoryApi::new(db);
    let err = api.fulfill_reservation(999).await.unwrap_err();
    assert!(matches!(err, StorefrontError::ReservationNotFound(999)));
}
