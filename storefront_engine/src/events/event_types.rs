use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Reservation};

/// Fired once per order, on the reconciliation call that actually moved it to `paid`. Duplicate
/// webhook deliveries do not re-fire it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub fulfilled: Vec<Reservation>,
}

impl OrderPaidEvent {
    pub fn new(order: Order, fulfilled: Vec<Reservation>) -> Self {
        Self { order, fulfilled }
    }
}

/// Fired when a pending order is cancelled and its holds are returned to availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub released: Vec<Reservation>,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order, released: Vec<Reservation>) -> Self {
        Self { order, released }
    }
}

/// Fired by the expiry sweeper after a sweep that released at least one stale hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReleasedEvent {
    pub released: Vec<Reservation>,
}

impl StockReleasedEvent {
    pub fn new(released: Vec<Reservation>) -> Self {
        Self { released }
    }
}
