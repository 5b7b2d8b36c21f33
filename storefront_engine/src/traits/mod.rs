//! Interface contracts for engine database backends.
//!
//! The module defines the behaviour a storage backend must expose in order to drive the storefront
//! engine:
//!
//! * [`StorefrontDatabase`] holds every atomic mutating operation: the reservation protocol
//!   (reserve / fulfill / cancel / expire), cart-to-order conversion, the order state writes and
//!   payment-session reconciliation. Each of these commits or rolls back as a single transaction.
//! * [`OrderManagement`] and [`InventoryManagement`] are the read side. Their results are advisory:
//!   they may be stale by the time a mutating call runs, and no mutating decision is ever based on
//!   them.

mod data_objects;
mod inventory_management;
mod order_management;
mod storefront_database;

pub use data_objects::{CancellationResult, OrderWithItems, ReconciliationResult};
pub use inventory_management::InventoryManagement;
pub use order_management::OrderManagement;
pub use storefront_database::{StorefrontDatabase, StorefrontError};
