//! The public-facing engine APIs, generic over the storage backend.
//!
//! [`OrderFlowApi`] drives the order lifecycle (cart conversion, status transitions, payment
//! reconciliation); [`InventoryApi`] exposes the ledger and the raw reservation protocol. Both
//! validate business rules before handing the atomic work to the backend.

mod inventory_api;
mod order_flow_api;

pub use inventory_api::InventoryApi;
pub use order_flow_api::OrderFlowApi;
