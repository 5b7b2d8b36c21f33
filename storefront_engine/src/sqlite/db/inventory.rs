//! Ledger and reservation queries.
//!
//! Every function takes a plain connection so callers control transaction boundaries. The
//! mutating queries here are written write-first and guarded: the availability check rides on the
//! `UPDATE` itself (`WHERE quantity_on_hand - quantity_reserved >= ?`), and reservation status
//! flips carry an `AND status = 'active'` guard, so racing callers are serialized by SQLite's
//! write lock rather than by anything in this process.

use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::{
    db_types::{InventoryRecord, Reservation, ReservationStatus},
    traits::StorefrontError,
};

const RESERVATION_COLUMNS: &str =
    "id, variant_id, quantity, cart_id, status, expires_at, created_at, updated_at";

/// Creates the ledger row for a variant if it does not exist yet (on hand and reserved both zero).
/// Rows are created lazily on the first stock-set or reservation attempt and never deleted.
pub async fn ensure_record(
    variant_id: &str,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    sqlx::query("INSERT OR IGNORE INTO inventory (variant_id) VALUES ($1)")
        .bind(variant_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_record(
    variant_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<InventoryRecord>, StorefrontError> {
    let record = sqlx::query_as::<_, InventoryRecord>(
        "SELECT variant_id, quantity_on_hand, quantity_reserved, updated_at \
         FROM inventory WHERE variant_id = $1",
    )
    .bind(variant_id)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}

/// The check-and-increment at the heart of the no-oversell guarantee. The availability comparison
/// and the reserved-quantity increment are one statement; if it matches no row, either the variant
/// has less than `quantity` available or the ledger row is missing, and the caller's transaction
/// must roll back.
pub async fn try_increment_reserved(
    variant_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    let result = sqlx::query(
        "UPDATE inventory \
         SET quantity_reserved = quantity_reserved + $1, updated_at = CURRENT_TIMESTAMP \
         WHERE variant_id = $2 AND quantity_on_hand - quantity_reserved >= $1",
    )
    .bind(quantity)
    .bind(variant_id)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() > 0 {
        return Ok(());
    }
    let available = fetch_record(variant_id, conn).await?.map(|r| r.available()).unwrap_or(0);
    Err(StorefrontError::InsufficientStock {
        variant_id: variant_id.to_string(),
        requested: quantity,
        available,
    })
}

/// Returns reserved units to availability. On-hand stock is untouched.
pub async fn release_reserved(
    variant_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    sqlx::query(
        "UPDATE inventory \
         SET quantity_reserved = quantity_reserved - $1, updated_at = CURRENT_TIMESTAMP \
         WHERE variant_id = $2",
    )
    .bind(quantity)
    .bind(variant_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Converts reserved units into a physical deduction: on-hand and reserved both drop.
pub async fn deduct_stock(
    variant_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    sqlx::query(
        "UPDATE inventory \
         SET quantity_on_hand = quantity_on_hand - $1, \
             quantity_reserved = quantity_reserved - $1, \
             updated_at = CURRENT_TIMESTAMP \
         WHERE variant_id = $2",
    )
    .bind(quantity)
    .bind(variant_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Administrative stock level upsert. Never touches `quantity_reserved`; lowering on-hand below
/// the currently reserved quantity trips the ledger CHECK constraint and fails.
pub async fn upsert_stock(
    variant_id: &str,
    on_hand: i64,
    conn: &mut SqliteConnection,
) -> Result<(), StorefrontError> {
    sqlx::query(
        "INSERT INTO inventory (variant_id, quantity_on_hand) VALUES ($1, $2) \
         ON CONFLICT (variant_id) DO UPDATE \
         SET quantity_on_hand = excluded.quantity_on_hand, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(variant_id)
    .bind(on_hand)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn insert_reservation(
    variant_id: &str,
    quantity: i64,
    cart_id: &str,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Reservation, StorefrontError> {
    let reservation = sqlx::query_as::<_, Reservation>(&format!(
        "INSERT INTO reservations (variant_id, quantity, cart_id, expires_at) \
         VALUES ($1, $2, $3, $4) RETURNING {RESERVATION_COLUMNS}"
    ))
    .bind(variant_id)
    .bind(quantity)
    .bind(cart_id)
    .bind(expires_at)
    .fetch_one(conn)
    .await?;
    trace!("🔒️ Reservation {} holds {quantity} x {variant_id} for {cart_id}", reservation.id);
    Ok(reservation)
}

pub async fn fetch_reservation(
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Reservation>, StorefrontError> {
    let reservation = sqlx::query_as::<_, Reservation>(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(reservation)
}

/// Moves a single active reservation to a terminal status. Returns the updated row, or `None` if
/// the reservation was missing or already terminal (the guard lost).
pub async fn transition_active_reservation(
    id: i64,
    to: ReservationStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Reservation>, StorefrontError> {
    let reservation = sqlx::query_as::<_, Reservation>(&format!(
        "UPDATE reservations SET status = $2, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $1 AND status = 'active' RETURNING {RESERVATION_COLUMNS}"
    ))
    .bind(id)
    .bind(to)
    .fetch_optional(conn)
    .await?;
    Ok(reservation)
}

/// Moves every active reservation for the correlation key to a terminal status, returning the
/// affected rows. The caller pairs this with the matching ledger adjustment in the same
/// transaction.
pub async fn transition_active_for_cart(
    cart_id: &str,
    to: ReservationStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<Reservation>, StorefrontError> {
    let reservations = sqlx::query_as::<_, Reservation>(&format!(
        "UPDATE reservations SET status = $2, updated_at = CURRENT_TIMESTAMP \
         WHERE cart_id = $1 AND status = 'active' RETURNING {RESERVATION_COLUMNS}"
    ))
    .bind(cart_id)
    .bind(to)
    .fetch_all(conn)
    .await?;
    Ok(reservations)
}

/// Flips every active reservation past its TTL to `expired`, returning the affected rows.
/// Re-running after the releases have committed finds nothing and returns an empty vector.
pub async fn expire_active_before(
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Reservation>, StorefrontError> {
    let reservations = sqlx::query_as::<_, Reservation>(&format!(
        "UPDATE reservations SET status = 'expired', updated_at = CURRENT_TIMESTAMP \
         WHERE status = 'active' AND expires_at < $1 RETURNING {RESERVATION_COLUMNS}"
    ))
    .bind(now)
    .fetch_all(conn)
    .await?;
    Ok(reservations)
}

pub async fn active_for_cart(
    cart_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Reservation>, StorefrontError> {
    let reservations = sqlx::query_as::<_, Reservation>(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations \
         WHERE cart_id = $1 AND status = 'active' ORDER BY id ASC"
    ))
    .bind(cart_id)
    .fetch_all(conn)
    .await?;
    Ok(reservations)
}
