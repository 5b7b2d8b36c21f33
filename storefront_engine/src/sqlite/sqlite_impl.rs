//! `SqliteDatabase` is the concrete SQLite backend for the storefront engine.
//!
//! SQLite has no `SELECT … FOR UPDATE`; instead every decision that must not race rides on the
//! mutating statement itself (conditional and guarded UPDATEs in the [`db`] module), and each
//! trait method wraps its statements in one transaction so the paired ledger and reservation
//! mutations commit or roll back together.

use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;
use sqlx::SqlitePool;
use storefront_common::Cents;

use super::db::{db_url, inventory, new_pool, orders};
use crate::{
    db_types::{
        InventoryRecord,
        NewOrder,
        Order,
        OrderId,
        OrderItem,
        OrderStatus,
        Reservation,
        ReservationStatus,
        Variant,
    },
    helpers::order_correlation_key,
    order_objects::OrderQueryFilter,
    traits::{
        CancellationResult,
        InventoryManagement,
        OrderManagement,
        OrderWithItems,
        ReconciliationResult,
        StorefrontDatabase,
        StorefrontError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using `STOREFRONT_DATABASE_URL` (or the default path).
    pub async fn new(max_connections: u32) -> Result<Self, StorefrontError> {
        let url = db_url();
        Self::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StorefrontError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn reserve(
        &self,
        variant_id: &str,
        quantity: i64,
        cart_id: &str,
        ttl: Duration,
    ) -> Result<Reservation, StorefrontError> {
        if quantity <= 0 {
            return Err(StorefrontError::InvalidQuantity(quantity));
        }
        let mut tx = self.pool.begin().await?;
        inventory::ensure_record(variant_id, &mut tx).await?;
        inventory::try_increment_reserved(variant_id, quantity, &mut tx).await?;
        let expires_at = Utc::now() + ttl;
        let reservation =
            inventory::insert_reservation(variant_id, quantity, cart_id, expires_at, &mut tx)
                .await?;
        tx.commit().await?;
        debug!("🔒️ Reserved {quantity} x {variant_id} for [{cart_id}] until {expires_at}");
        Ok(reservation)
    }

    async fn fulfill_reservation(&self, id: i64) -> Result<Reservation, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let reservation =
            match inventory::transition_active_reservation(id, ReservationStatus::Fulfilled, &mut tx)
                .await?
            {
                Some(r) => r,
                None => return Err(reservation_gone(id, &mut tx).await?),
            };
        inventory::deduct_stock(&reservation.variant_id, reservation.quantity, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🔒️ Reservation {id} fulfilled. {} x {} deducted from stock",
            reservation.quantity, reservation.variant_id
        );
        Ok(reservation)
    }

    async fn cancel_reservation(&self, id: i64) -> Result<Reservation, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let reservation =
            match inventory::transition_active_reservation(id, ReservationStatus::Cancelled, &mut tx)
                .await?
            {
                Some(r) => r,
                None => return Err(reservation_gone(id, &mut tx).await?),
            };
        inventory::release_reserved(&reservation.variant_id, reservation.quantity, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🔒️ Reservation {id} cancelled. {} x {} back in the pool",
            reservation.quantity, reservation.variant_id
        );
        Ok(reservation)
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let expired = inventory::expire_active_before(now, &mut tx).await?;
        for reservation in &expired {
            inventory::release_reserved(&reservation.variant_id, reservation.quantity, &mut tx)
                .await?;
        }
        tx.commit().await?;
        if !expired.is_empty() {
            debug!("🔒️ {} stale reservations expired and released", expired.len());
        }
        Ok(expired)
    }

    async fn create_order_from_cart(
        &self,
        order: NewOrder,
        ttl: Duration,
    ) -> Result<OrderWithItems, StorefrontError> {
        if order.items.is_empty() {
            return Err(StorefrontError::EmptyCart);
        }
        if let Some(line) = order.items.iter().find(|line| line.quantity <= 0) {
            return Err(StorefrontError::InvalidQuantity(line.quantity));
        }
        let mut tx = self.pool.begin().await?;
        let shell = orders::insert_order(&order.customer_email, &order.customer_name, &mut tx)
            .await?;
        let key = order_correlation_key(shell.id);
        let expires_at = Utc::now() + ttl;
        let mut items = Vec::with_capacity(order.items.len());
        let mut total = Cents::default();
        for line in &order.items {
            let variant = orders::fetch_variant(&line.variant_id, &mut tx)
                .await?
                .ok_or_else(|| StorefrontError::VariantNotFound(line.variant_id.clone()))?;
            inventory::ensure_record(&line.variant_id, &mut tx).await?;
            inventory::try_increment_reserved(&line.variant_id, line.quantity, &mut tx).await?;
            inventory::insert_reservation(
                &line.variant_id,
                line.quantity,
                &key,
                expires_at,
                &mut tx,
            )
            .await?;
            let item = orders::insert_order_item(shell.id, &variant, line.quantity, &mut tx).await?;
            total += item.line_total_cents;
            items.push(item);
        }
        let order = orders::set_order_total(shell.id, total, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order {} created for {} with {} lines, total {total}",
            order.id,
            order.customer_email,
            items.len()
        );
        Ok(OrderWithItems { order, items })
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        match orders::guarded_status_update(id, from, to, &mut tx).await? {
            Some(order) => {
                tx.commit().await?;
                debug!("🗃️ Order {id} moved {from} -> {to}");
                Ok(order)
            },
            None => Err(order_guard_lost(id, to, &mut tx).await?),
        }
    }

    async fn cancel_pending_order(&self, id: OrderId) -> Result<CancellationResult, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::guarded_status_update(
            id,
            OrderStatus::Pending,
            OrderStatus::Cancelled,
            &mut tx,
        )
        .await?
        {
            Some(order) => order,
            None => return Err(order_guard_lost(id, OrderStatus::Cancelled, &mut tx).await?),
        };
        let key = order_correlation_key(id);
        let released =
            inventory::transition_active_for_cart(&key, ReservationStatus::Cancelled, &mut tx)
                .await?;
        for reservation in &released {
            inventory::release_reserved(&reservation.variant_id, reservation.quantity, &mut tx)
                .await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {id} cancelled, {} holds released", released.len());
        Ok(CancellationResult { order, released })
    }

    async fn attach_payment_session(
        &self,
        id: OrderId,
        session_id: &str,
    ) -> Result<Order, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::set_payment_session(id, session_id, &mut conn)
            .await?
            .ok_or(StorefrontError::OrderNotFound(id))?;
        debug!("🗃️ Order {id} linked to payment session [{session_id}]");
        Ok(order)
    }

    async fn fulfill_by_payment_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ReconciliationResult>, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        match orders::mark_paid_by_session(session_id, &mut tx).await? {
            Some(order) => {
                let key = order_correlation_key(order.id);
                let fulfilled = inventory::transition_active_for_cart(
                    &key,
                    ReservationStatus::Fulfilled,
                    &mut tx,
                )
                .await?;
                for reservation in &fulfilled {
                    inventory::deduct_stock(&reservation.variant_id, reservation.quantity, &mut tx)
                        .await?;
                }
                tx.commit().await?;
                debug!(
                    "💰️ Order {} paid via session [{session_id}]. {} reservations fulfilled",
                    order.id,
                    fulfilled.len()
                );
                Ok(Some(ReconciliationResult { order, fulfilled, newly_paid: true }))
            },
            None => {
                // Either an unknown session or a duplicate delivery. Nothing was written.
                let existing = orders::fetch_order_by_payment_session(session_id, &mut tx).await?;
                if let Some(order) = &existing {
                    debug!(
                        "💰️ Duplicate confirmation for session [{session_id}]; order {} is already {}",
                        order.id, order.status
                    );
                }
                Ok(existing.map(|order| ReconciliationResult {
                    order,
                    fulfilled: Vec::new(),
                    newly_paid: false,
                }))
            },
        }
    }

    async fn set_stock(&self, variant_id: &str, on_hand: i64) -> Result<(), StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        inventory::upsert_stock(variant_id, on_hand, &mut conn).await?;
        debug!("🗃️ Stock level for {variant_id} set to {on_hand}");
        Ok(())
    }

    async fn upsert_variant(&self, variant: &Variant) -> Result<(), StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::upsert_variant(variant, &mut conn).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StorefrontError> {
        self.pool.close().await;
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_id(id, &mut conn).await
    }

    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_items(id, &mut conn).await
    }

    async fn fetch_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_orders(filter, &mut conn).await
    }

    async fn order_by_payment_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_payment_session(session_id, &mut conn).await
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn stock(&self, variant_id: &str) -> Result<Option<InventoryRecord>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        inventory::fetch_record(variant_id, &mut conn).await
    }

    async fn variant(&self, variant_id: &str) -> Result<Option<Variant>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_variant(variant_id, &mut conn).await
    }

    async fn reservation_by_id(&self, id: i64) -> Result<Option<Reservation>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        inventory::fetch_reservation(id, &mut conn).await
    }

    async fn active_reservations(&self, cart_id: &str) -> Result<Vec<Reservation>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        inventory::active_for_cart(cart_id, &mut conn).await
    }
}

/// Classifies a lost reservation guard: the row is either missing or already terminal. Always
/// returns the error to raise; the caller's transaction rolls back on drop.
async fn reservation_gone(
    id: i64,
    conn: &mut sqlx::SqliteConnection,
) -> Result<StorefrontError, StorefrontError> {
    let err = match inventory::fetch_reservation(id, conn).await? {
        None => StorefrontError::ReservationNotFound(id),
        Some(r) => StorefrontError::ReservationNotActive { id, status: r.status },
    };
    Ok(err)
}

/// Classifies a lost order-status guard.
async fn order_guard_lost(
    id: OrderId,
    to: OrderStatus,
    conn: &mut sqlx::SqliteConnection,
) -> Result<StorefrontError, StorefrontError> {
    let err = match orders::fetch_order_by_id(id, conn).await? {
        None => StorefrontError::OrderNotFound(id),
        Some(order) => StorefrontError::illegal_transition(order.status, to),
    };
    Ok(err)
}
