#![allow(dead_code)]

use storefront_common::Cents;
use storefront_engine::{
    db_types::Variant,
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    SqliteDatabase,
    StorefrontDatabase,
};

/// Creates a fresh, migrated throwaway database under the system temp directory.
pub async fn new_test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database")
}

/// Seeds a catalog variant and its physical stock level.
pub async fn seed_variant(
    db: &SqliteDatabase,
    variant_id: &str,
    product_name: &str,
    price_cents: i64,
    on_hand: i64,
) {
    let variant = Variant {
        variant_id: variant_id.to_string(),
        product_name: product_name.to_string(),
        sku: format!("SKU-{}", variant_id.to_uppercase()),
        price_cents: Cents::from(price_cents),
    };
    db.upsert_variant(&variant).await.expect("Error seeding variant");
    db.set_stock(variant_id, on_hand).await.expect("Error seeding stock");
}
