use serde::{Deserialize, Serialize};
use storefront_common::Cents;

use crate::db_types::{Order, OrderItem, Reservation};

/// An order together with its snapshotted line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderWithItems {
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Recomputed from the snapshots. Always equal to `order.total_cents`.
    pub fn subtotal(&self) -> Cents {
        self.items.iter().map(|i| i.line_total_cents).sum()
    }
}

/// The outcome of reconciling a payment-confirmation signal against an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub order: Order,
    /// The reservations fulfilled by this call. Empty on a duplicate delivery.
    pub fulfilled: Vec<Reservation>,
    /// True only on the call that actually moved the order to `paid`.
    pub newly_paid: bool,
}

/// The outcome of cancelling a pending order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationResult {
    pub order: Order,
    /// The holds released back to availability.
    pub released: Vec<Reservation>,
}

impl CancellationResult {
    pub fn released_units(&self) -> i64 {
        self.released.iter().map(|r| r.quantity).sum()
    }
}
