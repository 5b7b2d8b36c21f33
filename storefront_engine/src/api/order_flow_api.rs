use std::fmt::Debug;

use chrono::Duration;
use log::*;

use crate::{
    config,
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatus},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent},
    order_objects::OrderQueryFilter,
    traits::{OrderWithItems, ReconciliationResult, StorefrontDatabase, StorefrontError},
};

/// `OrderFlowApi` is the primary API for the order lifecycle: converting carts into priced orders,
/// enforcing the status transition graph, and reconciling asynchronous payment confirmations.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    reservation_ttl: Duration,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, reservation_ttl: config::reservation_ttl() }
    }

    pub fn with_reservation_ttl(mut self, ttl: Duration) -> Self {
        self.reservation_ttl = ttl;
        self
    }
}

impl<B> OrderFlowApi<B>
where B: StorefrontDatabase
{
    /// Converts a cart into a priced, pending order, all-or-nothing.
    ///
    /// Every line is reserved and price-snapshotted inside one backend transaction; if any line
    /// has insufficient stock the whole attempt rolls back and no hold survives. On success the
    /// caller (the cart collaborator) should clear the source cart.
    pub async fn create_order(&self, order: NewOrder) -> Result<OrderWithItems, StorefrontError> {
        if order.items.is_empty() {
            return Err(StorefrontError::EmptyCart);
        }
        let result = self.db.create_order_from_cart(order, self.reservation_ttl).await?;
        info!(
            "🔄️📦️ Order {} created: {} lines, total {}",
            result.order.id,
            result.line_count(),
            result.order.total_cents
        );
        Ok(result)
    }

    pub async fn order(&self, id: OrderId) -> Result<Option<Order>, StorefrontError> {
        self.db.order_by_id(id).await
    }

    pub async fn order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, StorefrontError> {
        self.db.order_items(id).await
    }

    /// Unlocked listing projection.
    pub async fn list_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, StorefrontError> {
        self.db.fetch_orders(filter).await
    }

    /// Stores the checkout-session id returned by the payment provider so the confirmation
    /// callback can be matched to this order later.
    pub async fn attach_payment_session(
        &self,
        id: OrderId,
        session_id: &str,
    ) -> Result<Order, StorefrontError> {
        self.db.attach_payment_session(id, session_id).await
    }

    /// Changes the status of an order, enforcing the transition graph.
    ///
    /// | From \ To  | paid | processing | shipped | delivered | cancelled | refunded |
    /// |------------|------|------------|---------|-----------|-----------|----------|
    /// | pending    | ✓    |            |         |           | ✓ (1)     |          |
    /// | paid       |      | ✓          |         |           | ✓         | ✓        |
    /// | processing |      |            | ✓       |           | ✓         |          |
    /// | shipped    |      |            |         | ✓         |           |          |
    /// | delivered  |      |            |         |           |           | ✓        |
    ///
    /// `cancelled` and `refunded` are terminal. Anything not in the table fails with
    /// `IllegalTransition`, naming the attempted and allowed states.
    ///
    /// (1) Cancelling a pending order releases every hold still active for it — the only
    /// transition with an inventory side effect. Fulfilment of holds happens through payment
    /// reconciliation, not through this method.
    pub async fn transition_order(
        &self,
        id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Order, StorefrontError> {
        let order =
            self.db.order_by_id(id).await?.ok_or(StorefrontError::OrderNotFound(id))?;
        let from = order.status;
        if !from.can_transition_to(new_status) {
            return Err(StorefrontError::illegal_transition(from, new_status));
        }
        match (from, new_status) {
            (OrderStatus::Pending, OrderStatus::Cancelled) => {
                let result = self.db.cancel_pending_order(id).await?;
                info!(
                    "🔄️📦️ Order {id} cancelled; {} units returned to availability",
                    result.released_units()
                );
                self.call_order_annulled_hook(&result.order, result.released.clone()).await;
                Ok(result.order)
            },
            _ => {
                let order = self.db.update_order_status(id, from, new_status).await?;
                debug!("🔄️📦️ Order {id} moved {from} -> {new_status}");
                Ok(order)
            },
        }
    }

    /// Reconciles a payment confirmation for the given checkout session, idempotently.
    ///
    /// Safe to call an unbounded number of times with the same session id: only the call that
    /// actually moves the order to `paid` fulfils its reservations and fires the order-paid hook.
    /// `Ok(None)` means no order carries this session id yet; webhook callers should treat that
    /// as retryable.
    pub async fn fulfill_by_payment_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ReconciliationResult>, StorefrontError> {
        let result = self.db.fulfill_by_payment_session(session_id).await?;
        match &result {
            Some(r) if r.newly_paid => {
                info!(
                    "🔄️💰️ Order {} paid via session [{session_id}]; {} holds fulfilled",
                    r.order.id,
                    r.fulfilled.len()
                );
                self.call_order_paid_hook(&r.order, r.fulfilled.clone()).await;
            },
            Some(r) => {
                debug!(
                    "🔄️💰️ Duplicate confirmation for session [{session_id}] ignored; order {} is {}",
                    r.order.id, r.order.status
                );
            },
            None => {
                warn!("🔄️💰️ No order found for payment session [{session_id}]");
            },
        }
        Ok(result)
    }

    async fn call_order_paid_hook(&self, order: &Order, fulfilled: Vec<crate::db_types::Reservation>) {
        for emitter in &self.producers.order_paid_producer {
            trace!("🔄️📦️ Notifying order paid hook subscribers");
            let event = OrderPaidEvent::new(order.clone(), fulfilled.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_order_annulled_hook(
        &self,
        order: &Order,
        released: Vec<crate::db_types::Reservation>,
    ) {
        for emitter in &self.producers.order_annulled_producer {
            trace!("🔄️📦️ Notifying order annulled hook subscribers");
            let event = OrderAnnulledEvent::new(order.clone(), released.clone());
            emitter.publish_event(event).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
