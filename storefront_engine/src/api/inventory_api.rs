use std::fmt::Debug;

use chrono::{DateTime, Duration, Utc};
use log::*;

use crate::{
    config,
    db_types::{InventoryRecord, Reservation, Variant},
    traits::{StorefrontDatabase, StorefrontError},
};

/// `InventoryApi` exposes the ledger and the raw reservation protocol: administrative stock
/// writes, advisory stock reads, and direct reserve/cancel/fulfill/expire operations for callers
/// that hold stock outside the order flow.
pub struct InventoryApi<B> {
    db: B,
    reservation_ttl: Duration,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, reservation_ttl: config::reservation_ttl() }
    }

    pub fn with_reservation_ttl(mut self, ttl: Duration) -> Self {
        self.reservation_ttl = ttl;
        self
    }
}

impl<B> InventoryApi<B>
where B: StorefrontDatabase
{
    /// The ledger entry for a variant. Advisory: the values may be stale by the time a mutating
    /// call runs, and no mutating decision may be based on them.
    pub async fn stock(&self, variant_id: &str) -> Result<InventoryRecord, StorefrontError> {
        self.db
            .stock(variant_id)
            .await?
            .ok_or_else(|| StorefrontError::VariantNotFound(variant_id.to_string()))
    }

    /// Administrative, idempotent stock-level upsert. Never touches the reserved quantity.
    pub async fn set_stock(&self, variant_id: &str, on_hand: i64) -> Result<(), StorefrontError> {
        self.db.set_stock(variant_id, on_hand).await
    }

    /// Administrative, idempotent catalog upsert (order snapshot source).
    pub async fn upsert_variant(&self, variant: &Variant) -> Result<(), StorefrontError> {
        self.db.upsert_variant(variant).await
    }

    /// Places a hold of `quantity` units for `cart_id`, expiring after the configured TTL.
    /// Exactly one of two racing callers for the last unit succeeds; the loser gets
    /// `InsufficientStock`.
    pub async fn reserve(
        &self,
        variant_id: &str,
        quantity: i64,
        cart_id: &str,
    ) -> Result<Reservation, StorefrontError> {
        self.db.reserve(variant_id, quantity, cart_id, self.reservation_ttl).await
    }

    pub async fn cancel_reservation(&self, id: i64) -> Result<Reservation, StorefrontError> {
        self.db.cancel_reservation(id).await
    }

    pub async fn fulfill_reservation(&self, id: i64) -> Result<Reservation, StorefrontError> {
        self.db.fulfill_reservation(id).await
    }

    pub async fn reservation(&self, id: i64) -> Result<Option<Reservation>, StorefrontError> {
        self.db.reservation_by_id(id).await
    }

    pub async fn active_reservations(
        &self,
        cart_id: &str,
    ) -> Result<Vec<Reservation>, StorefrontError> {
        self.db.active_reservations(cart_id).await
    }

    /// Releases every reservation past its TTL. Idempotent; returns the released holds.
    pub async fn expire_stale(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, StorefrontError> {
        let released = self.db.expire_stale(now).await?;
        if !released.is_empty() {
            info!("🕰️ {} stale reservations released", released.len());
        }
        Ok(released)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
