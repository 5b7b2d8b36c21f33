//! Order, order-item and variant queries.

use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};
use storefront_common::Cents;

use crate::{
    db_types::{Order, OrderId, OrderItem, OrderStatus, Variant},
    helpers::line_total,
    order_objects::OrderQueryFilter,
    traits::StorefrontError,
};

const ORDER_COLUMNS: &str = "id, customer_email, customer_name, status, total_cents, \
                             payment_session_id, created_at, updated_at";
const ITEM_COLUMNS: &str =
    "id, order_id, variant_id, product_name, sku, quantity, unit_price_cents, line_total_cents";

/// Inserts a new pending order shell. The total is written once the line items have been
/// snapshotted, within the same transaction.
pub async fn insert_order(
    customer_email: &str,
    customer_name: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, StorefrontError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO orders (customer_email, customer_name) VALUES ($1, $2) \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(customer_email)
    .bind(customer_name)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

/// Snapshots one cart line against the given variant's current catalog values.
pub async fn insert_order_item(
    order_id: OrderId,
    variant: &Variant,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, StorefrontError> {
    let total = line_total(quantity, variant.price_cents)?;
    let item = sqlx::query_as::<_, OrderItem>(&format!(
        "INSERT INTO order_items \
         (order_id, variant_id, product_name, sku, quantity, unit_price_cents, line_total_cents) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ITEM_COLUMNS}"
    ))
    .bind(order_id)
    .bind(&variant.variant_id)
    .bind(&variant.product_name)
    .bind(&variant.sku)
    .bind(quantity)
    .bind(variant.price_cents)
    .bind(total)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn set_order_total(
    id: OrderId,
    total: Cents,
    conn: &mut SqliteConnection,
) -> Result<Order, StorefrontError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET total_cents = $2, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(total)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(
    id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorefrontError> {
    let order =
        sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(order)
}

pub async fn fetch_order_by_payment_session(
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorefrontError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE payment_session_id = $1"
    ))
    .bind(session_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_items(
    id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, StorefrontError> {
    let items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id ASC"
    ))
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Fetches orders according to the criteria in the `OrderQueryFilter`, ordered by creation time
/// ascending.
pub async fn fetch_orders(
    filter: OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, StorefrontError> {
    let mut builder =
        QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders "));
    if !filter.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(email) = filter.customer_email {
        where_clause.push("customer_email = ");
        where_clause.push_bind_unseparated(email);
    }
    if !filter.statuses.is_empty() {
        let statuses =
            filter.statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    builder.push(" ORDER BY created_at ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

/// Guarded status write: only succeeds if the order still has the expected `from` status.
/// Returns `None` when the guard loses (missing order or status moved concurrently).
pub async fn guarded_status_update(
    id: OrderId,
    from: OrderStatus,
    to: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorefrontError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET status = $3, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(from)
    .bind(to)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// The write-first half of webhook reconciliation: flips the order to `paid` only if it is still
/// pending. `None` means either no order carries the session id or the order already left
/// `pending` (a duplicate delivery); the caller distinguishes the two with an unlocked read.
pub async fn mark_paid_by_session(
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorefrontError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET status = 'paid', updated_at = CURRENT_TIMESTAMP \
         WHERE payment_session_id = $1 AND status = 'pending' RETURNING {ORDER_COLUMNS}"
    ))
    .bind(session_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn set_payment_session(
    id: OrderId,
    session_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StorefrontError> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET payment_session_id = $2, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(session_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

pub async fn upsert_variant(
    variant: &Variant,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    sqlx::query(
        "INSERT INTO variants (variant_id, product_name, sku, price_cents) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (variant_id) DO UPDATE SET \
             product_name = excluded.product_name, \
             sku = excluded.sku, \
             price_cents = excluded.price_cents, \
             updated_at = CURRENT_TIMESTAMP",
    )
    .bind(&variant.variant_id)
    .bind(&variant.product_name)
    .bind(&variant.sku)
    .bind(variant.price_cents)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_variant(
    variant_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Variant>, StorefrontError> {
    let variant = sqlx::query_as::<_, Variant>(
        "SELECT variant_id, product_name, sku, price_cents FROM variants WHERE variant_id = $1",
    )
    .bind(variant_id)
    .fetch_optional(conn)
    .await?;
    Ok(variant)
}
