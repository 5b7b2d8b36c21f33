use crate::{
    db_types::{InventoryRecord, Reservation, Variant},
    traits::StorefrontError,
};

/// Read-only ledger and reservation projections, for display and diagnostics. Unlocked and
/// advisory; the reservation engine never bases a decision on these reads.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    /// The ledger entry for a variant, or `None` if no stock has ever been set or reserved.
    async fn stock(&self, variant_id: &str) -> Result<Option<InventoryRecord>, StorefrontError>;

    async fn variant(&self, variant_id: &str) -> Result<Option<Variant>, StorefrontError>;

    async fn reservation_by_id(&self, id: i64) -> Result<Option<Reservation>, StorefrontError>;

    /// All reservations still active for the given correlation key.
    async fn active_reservations(&self, cart_id: &str) -> Result<Vec<Reservation>, StorefrontError>;
}
