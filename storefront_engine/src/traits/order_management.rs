use crate::{
    db_types::{Order, OrderId, OrderItem},
    order_objects::OrderQueryFilter,
    traits::StorefrontError,
};

/// Read-only order projections. Unlocked; results may be stale by the time a mutating call runs,
/// and correctness never depends on them.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, StorefrontError>;

    async fn order_items(&self, id: OrderId) -> Result<Vec<OrderItem>, StorefrontError>;

    /// Fetches orders matching the filter, ordered by creation time ascending.
    async fn fetch_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, StorefrontError>;

    async fn order_by_payment_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Order>, StorefrontError>;
}
