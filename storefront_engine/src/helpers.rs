//! Small free functions shared across the engine.

use storefront_common::Cents;

use crate::{db_types::OrderId, traits::StorefrontError};

/// The correlation key tying an order to the reservations that were made for it.
///
/// Reservations are keyed by a plain string so that holds can also be taken against cart ids that
/// never become orders. The order id is allocated before the reservations are made (inside the
/// same transaction), so the derived key is exact and collision-free.
pub fn order_correlation_key(order_id: OrderId) -> String {
    format!("order-{}", order_id.value())
}

/// The total for a single snapshotted order line. Exact integer product; line totals are never
/// rounded, and a product that does not fit in an `i64` fails with `AmountOverflow`.
pub fn line_total(quantity: i64, unit_price: Cents) -> Result<Cents, StorefrontError> {
    unit_price.checked_mul(quantity).map_err(StorefrontError::from)
}
