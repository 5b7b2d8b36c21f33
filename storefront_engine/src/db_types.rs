use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use storefront_common::Cents;
use thiserror::Error;

//--------------------------------------       OrderId       ---------------------------------------------------------
/// The database id of an order. The reservation correlation key is derived from it
/// (see [`crate::helpers::order_correlation_key`]) rather than stored as a foreign key, because
/// reservations can also be held against plain cart ids that never become orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub i64);

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------     OrderStatus     ---------------------------------------------------------
/// The order lifecycle. Orders are created as `Pending` and move through the transition graph in
/// [`OrderStatus::allowed_transitions`]; `Cancelled` and `Refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created from a cart; stock is reserved but not yet deducted.
    Pending,
    /// Payment confirmed; the order's reservations have been fulfilled.
    Paid,
    /// Being picked and packed.
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// The set of statuses this status may legally transition to.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Paid, Cancelled],
            Paid => &[Processing, Cancelled, Refunded],
            Processing => &[Shipped, Cancelled],
            Shipped => &[Delivered],
            Delivered => &[Refunded],
            Cancelled | Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, new_status: OrderStatus) -> bool {
        self.allowed_transitions().contains(&new_status)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct StatusConversionError(String);

impl FromStr for OrderStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            s => Err(StatusConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------  ReservationStatus  ---------------------------------------------------------
/// The lifecycle of an inventory hold. A reservation leaves `Active` exactly once and is never
/// reactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Active,
    /// Converted into a permanent stock deduction after payment.
    Fulfilled,
    /// Released by the expiry sweeper after its TTL lapsed.
    Expired,
    Cancelled,
}

impl Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReservationStatus::Active => "active",
            ReservationStatus::Fulfilled => "fulfilled",
            ReservationStatus::Expired => "expired",
            ReservationStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ReservationStatus {
    type Err = StatusConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "fulfilled" => Ok(Self::Fulfilled),
            "expired" => Ok(Self::Expired),
            "cancelled" => Ok(Self::Cancelled),
            s => Err(StatusConversionError(format!("Invalid reservation status: {s}"))),
        }
    }
}

//--------------------------------------       Variant       ---------------------------------------------------------
/// A sellable SKU as known to the catalog collaborator. The engine reads it only to snapshot
/// order lines; the catalog collaborator maintains it through the `upsert_variant` operation.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Variant {
    pub variant_id: String,
    pub product_name: String,
    pub sku: String,
    pub price_cents: Cents,
}

//--------------------------------------   InventoryRecord   ---------------------------------------------------------
/// Per-variant ledger entry. `available()` can go stale the moment it is read; callers must never
/// base a mutating decision on it. The reservation engine makes its decisions inside the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub variant_id: String,
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
    pub updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// Advisory only. See the struct docs.
    pub fn available(&self) -> i64 {
        self.quantity_on_hand - self.quantity_reserved
    }
}

//--------------------------------------     Reservation     ---------------------------------------------------------
/// A time-boxed soft hold against the ledger, correlated to the owning cart or order via `cart_id`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub variant_id: String,
    pub quantity: i64,
    pub cart_id: String,
    pub status: ReservationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_email: String,
    pub customer_name: String,
    pub status: OrderStatus,
    /// Fixed at creation time from the line-item snapshots. Never recomputed.
    pub total_cents: Cents,
    pub payment_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      OrderItem      ---------------------------------------------------------
/// A price-snapshotted order line. Immutable once the order exists; later catalog changes must not
/// leak into it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: OrderId,
    pub variant_id: String,
    pub product_name: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_price_cents: Cents,
    pub line_total_cents: Cents,
}

//--------------------------------------      CartItem       ---------------------------------------------------------
/// One line of the cart collaborator's `(variant, quantity)` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub variant_id: String,
    pub quantity: i64,
}

impl CartItem {
    pub fn new<S: Into<String>>(variant_id: S, quantity: i64) -> Self {
        Self { variant_id: variant_id.into(), quantity }
    }
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
/// Everything the order service needs to convert a cart into an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_email: String,
    pub customer_name: String,
    pub items: Vec<CartItem>,
}

impl NewOrder {
    pub fn new<S: Into<String>, T: Into<String>>(email: S, name: T, items: Vec<CartItem>) -> Self {
        Self { customer_email: email.into(), customer_name: name.into(), items }
    }
}
