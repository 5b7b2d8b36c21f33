//! Storefront Engine
//!
//! The inventory-reservation and order-fulfilment engine of the storefront backend. It guarantees
//! that stock is never oversold when many customers race for the last units, converts carts into
//! priced orders atomically, enforces the order lifecycle, and reconciles order state with an
//! at-least-once payment-confirmation callback.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`] and the backend contracts in
//!    [`mod@traits`]). SQLite is the supported backend. You should never need to touch the
//!    database directly; use the public APIs. The exception is the data types stored in the
//!    database, which are defined in [`mod@db_types`] and are public.
//! 2. The engine public API: [`OrderFlowApi`] for the order lifecycle and [`InventoryApi`] for
//!    the ledger and the raw reservation protocol. Both are generic over any backend implementing
//!    the [`traits::StorefrontDatabase`] contract.
//! 3. Background work: the [`mod@sweeper`] task that periodically returns stale holds to
//!    availability.
//!
//! The engine also emits events (order paid, order annulled, stock released) through a simple
//! hook system in [`mod@events`], so embedding applications can react without coupling to engine
//! internals.

pub mod config;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod order_objects;
pub mod sweeper;
pub mod traits;

mod api;
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{InventoryApi, OrderFlowApi};
pub use sqlite::SqliteDatabase;
pub use traits::{
    CancellationResult,
    InventoryManagement,
    OrderManagement,
    OrderWithItems,
    ReconciliationResult,
    StorefrontDatabase,
    StorefrontError,
};
