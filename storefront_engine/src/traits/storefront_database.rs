use chrono::{DateTime, Duration, Utc};
use storefront_common::CentsConversionError;
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatus, Reservation, ReservationStatus, Variant},
    traits::{
        data_objects::{CancellationResult, OrderWithItems, ReconciliationResult},
        InventoryManagement,
        OrderManagement,
    },
};

/// The error taxonomy of the engine.
///
/// Every variant except `Database` is a business-rule failure: it is surfaced to the caller
/// verbatim and never retried automatically. `Database` wraps infrastructure failures (lock
/// timeout, connection loss); the mutation is guaranteed to have rolled back in full, so the
/// caller may retry the whole operation as a fresh attempt.
#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("Insufficient stock for variant {variant_id}: requested {requested}, available {available}")]
    InsufficientStock { variant_id: String, requested: i64, available: i64 },
    #[error("Variant not found: {0}")]
    VariantNotFound(String),
    #[error("Reservation not found: {0}")]
    ReservationNotFound(i64),
    #[error("Reservation {id} is not active (status: {status})")]
    ReservationNotActive { id: i64, status: ReservationStatus },
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),
    #[error("Cannot create an order from an empty cart")]
    EmptyCart,
    #[error("Reservation quantity must be positive (got {0})")]
    InvalidQuantity(i64),
    #[error("Monetary amount overflow: {0}")]
    AmountOverflow(#[from] CentsConversionError),
    #[error("Illegal order status transition {from} -> {to}. Allowed from {from}: [{allowed}]")]
    IllegalTransition { from: OrderStatus, to: OrderStatus, allowed: String },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StorefrontError {
    pub fn illegal_transition(from: OrderStatus, to: OrderStatus) -> Self {
        let allowed = from
            .allowed_transitions()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self::IllegalTransition { from, to, allowed }
    }
}

/// The highest level of behaviour for backends supporting the storefront engine.
///
/// Every method on this trait is a single ACID transaction: the paired ledger and reservation
/// mutations commit together or not at all. A failed call leaves no partial change behind.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone + OrderManagement + InventoryManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Places a time-boxed hold of `quantity` units of `variant_id` on behalf of `cart_id`.
    ///
    /// The availability check and the reserved-quantity increment execute as one statement inside
    /// the database, so two callers racing for the last unit are serialized by the store, not by
    /// application logic: exactly one succeeds, the other observes the post-increment state and
    /// fails with `InsufficientStock`. Fails with `InvalidQuantity` unless `quantity > 0`.
    async fn reserve(
        &self,
        variant_id: &str,
        quantity: i64,
        cart_id: &str,
        ttl: Duration,
    ) -> Result<Reservation, StorefrontError>;

    /// Converts an active reservation into a permanent stock deduction: `quantity_on_hand` and
    /// `quantity_reserved` both drop by the reserved quantity. This is the only operation that
    /// reduces physical stock.
    ///
    /// Fails with `ReservationNotActive` if the reservation has already reached a terminal state.
    async fn fulfill_reservation(&self, id: i64) -> Result<Reservation, StorefrontError>;

    /// Releases an active reservation: `quantity_reserved` drops by the reserved quantity,
    /// `quantity_on_hand` is untouched.
    async fn cancel_reservation(&self, id: i64) -> Result<Reservation, StorefrontError>;

    /// Releases every active reservation whose `expires_at` lies before `now`, returning the
    /// released reservations. Idempotent: a rerun finds no more active expired rows and returns
    /// an empty vector.
    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>, StorefrontError>;

    /// Converts a cart into a priced order, all-or-nothing.
    ///
    /// In a single transaction: allocates the order id, reserves stock for every line item under
    /// the derived correlation key, snapshots each variant's current name/SKU/price into an order
    /// item, and fixes `total_cents` as the sum of the line totals. If any line cannot be
    /// reserved the whole transaction rolls back; a failed attempt never leaves orphaned holds.
    async fn create_order_from_cart(
        &self,
        order: NewOrder,
        ttl: Duration,
    ) -> Result<OrderWithItems, StorefrontError>;

    /// Writes a validated status change. The write is guarded on the expected current status, so a
    /// concurrent transition loses cleanly instead of clobbering.
    ///
    /// Callers are expected to have validated the transition against
    /// [`OrderStatus::allowed_transitions`](crate::db_types::OrderStatus::allowed_transitions)
    /// first; this method re-checks under the transaction and fails with `IllegalTransition` if
    /// the order moved in the meantime.
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, StorefrontError>;

    /// Cancels a pending order and releases every active reservation correlated to it, atomically.
    /// This is the only transition with an inventory side effect.
    async fn cancel_pending_order(&self, id: OrderId) -> Result<CancellationResult, StorefrontError>;

    /// Stores the external checkout-session id on the order so that the asynchronous payment
    /// confirmation can find it later.
    async fn attach_payment_session(
        &self,
        id: OrderId,
        session_id: &str,
    ) -> Result<Order, StorefrontError>;

    /// Reconciles an asynchronous payment confirmation, idempotently.
    ///
    /// * `Ok(None)` — no order carries this session id. The caller should treat this as
    ///   retryable: the order row may not have been committed yet.
    /// * If the order is no longer `pending`, it is returned unchanged with `newly_paid == false`.
    ///   A duplicate delivery of the same confirmation never double-fulfills.
    /// * Otherwise the order moves to `paid` and every reservation correlated to it is fulfilled,
    ///   in the same transaction.
    async fn fulfill_by_payment_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ReconciliationResult>, StorefrontError>;

    /// Administrative, idempotent upsert of the physical stock level. Never touches
    /// `quantity_reserved`.
    async fn set_stock(&self, variant_id: &str, on_hand: i64) -> Result<(), StorefrontError>;

    /// Administrative, idempotent upsert of a catalog variant (the order snapshot source).
    async fn upsert_variant(&self, variant: &Variant) -> Result<(), StorefrontError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StorefrontError> {
        Ok(())
    }
}
