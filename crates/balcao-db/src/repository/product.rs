//! # Product Repository
//!
//! Database operations for the product catalog and its stock.
//!
//! ## Guarded Stock Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │        decrement_stock_guarded(intent, product, qty)            │
//! │                                                                 │
//! │  INSERT OR IGNORE stock_movements(intent_id, product_id)        │
//! │       │                                                         │
//! │       ├── row already there? ──► return false (already applied) │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  UPDATE products SET stock = MAX(0, stock - qty)                │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  return true                                                    │
//! │                                                                 │
//! │  The guard row makes the decrement idempotent per intent: a     │
//! │  replayed commit sequence (crash recovery, reconciliation)      │
//! │  cannot subtract the same line twice. The MAX(0, ...) clamp     │
//! │  enforces the never-negative stock invariant in the same        │
//! │  statement that reads the current value, so concurrent commits  │
//! │  cannot race it below zero.                                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use balcao_core::{Money, Product, Quantity, UnitOfMeasure};

/// Row shape for the `products` table.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category: String,
    price_cents: i64,
    cost_cents: i64,
    stock_milli: i64,
    min_stock_milli: i64,
    unit: UnitOfMeasure,
    barcodes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> DbResult<Product> {
        Ok(Product {
            id: self.id,
            name: self.name,
            category: self.category,
            price: Money::from_cents(self.price_cents),
            cost_price: Money::from_cents(self.cost_cents),
            stock: Quantity::from_milli(self.stock_milli),
            min_stock: Quantity::from_milli(self.min_stock_milli),
            unit: self.unit,
            barcodes: serde_json::from_str(&self.barcodes)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_PRODUCT: &str = "SELECT id, name, category, price_cents, cost_cents, \
     stock_milli, min_stock_milli, unit, barcodes, created_at, updated_at \
     FROM products";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists the whole catalog, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ProductRow::into_product).collect()
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        row.into_product()
    }

    /// Looks a product up by one of its scan codes.
    ///
    /// The `barcodes` column is a JSON array; `json_each` unnests it so
    /// a scan string can be matched against every code of every product.
    /// Returns `None` when no product carries the code.
    pub async fn get_by_scan_code(&self, code: &str) -> DbResult<Option<Product>> {
        debug!(code = %code, "Looking up product by scan code");

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "{SELECT_PRODUCT} p \
             WHERE EXISTS (SELECT 1 FROM json_each(p.barcodes) WHERE json_each.value = ?1) \
             LIMIT 1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProductRow::into_product).transpose()
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO products \
             (id, name, category, price_cents, cost_cents, stock_milli, \
              min_stock_milli, unit, barcodes, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price.cents())
        .bind(product.cost_price.cents())
        .bind(product.stock.milli())
        .bind(product.min_stock.milli())
        .bind(product.unit)
        .bind(serde_json::to_string(&product.barcodes)?)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %product.id, name = %product.name, "Product inserted");
        Ok(())
    }

    /// Updates a product's catalog fields.
    ///
    /// Stock is deliberately not written here: it only moves through
    /// [`restock`](Self::restock) and
    /// [`decrement_stock_guarded`](Self::decrement_stock_guarded), so a
    /// catalog edit cannot overwrite a concurrent sale's decrement with
    /// a stale value.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET \
             name = ?2, category = ?3, price_cents = ?4, cost_cents = ?5, \
             min_stock_milli = ?6, unit = ?7, barcodes = ?8, updated_at = ?9 \
             WHERE id = ?1",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price.cents())
        .bind(product.cost_price.cents())
        .bind(product.min_stock.milli())
        .bind(product.unit)
        .bind(serde_json::to_string(&product.barcodes)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Adds received stock. The result is clamped at zero so a negative
    /// correction cannot take the count below zero.
    pub async fn restock(&self, id: &str, delta: Quantity) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET \
             stock_milli = MAX(0, stock_milli + ?2), updated_at = ?3 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(delta.milli())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(id = %id, delta = %delta, "Stock adjusted");
        Ok(())
    }

    /// Applies a sale line's stock decrement exactly once per intent.
    ///
    /// ## Returns
    /// * `Ok(true)` - decrement applied now
    /// * `Ok(false)` - a guard row for this (intent, product) already
    ///   existed; the decrement had been applied by an earlier attempt
    pub async fn decrement_stock_guarded(
        &self,
        intent_id: &str,
        product_id: &str,
        quantity: Quantity,
    ) -> DbResult<bool> {
        let guard = sqlx::query(
            "INSERT OR IGNORE INTO stock_movements \
             (intent_id, product_id, quantity_milli, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(intent_id)
        .bind(product_id)
        .bind(quantity.milli())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if guard.rows_affected() == 0 {
            debug!(intent_id = %intent_id, product_id = %product_id, "Decrement already applied, skipping");
            return Ok(false);
        }

        let result = sqlx::query(
            "UPDATE products SET \
             stock_milli = MAX(0, stock_milli - ?2), updated_at = ?3 \
             WHERE id = ?1",
        )
        .bind(product_id)
        .bind(quantity.milli())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Product vanished between cart build and commit. The guard
            // row stays so a replay won't retry a decrement that has
            // nothing to land on.
            return Err(DbError::not_found("Product", product_id));
        }

        debug!(intent_id = %intent_id, product_id = %product_id, quantity = %quantity, "Stock decremented");
        Ok(true)
    }

    /// Counts products (for diagnostics and seed checks).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn product(name: &str, stock: i64, barcodes: Vec<String>) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category: "Geral".to_string(),
            price: Money::from_cents(1000),
            cost_price: Money::from_cents(700),
            stock: Quantity::from_units(stock),
            min_stock: Quantity::from_units(2),
            unit: UnitOfMeasure::Unit,
            barcodes,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_roundtrip() {
        let db = test_db().await;
        let repo = db.products();
        let original = product("Café 500g", 10, vec!["7891000053508".into()]);

        repo.insert(&original).await.unwrap();
        let stored = repo.get_by_id(&original.id).await.unwrap();

        assert_eq!(stored.name, original.name);
        assert_eq!(stored.price, original.price);
        assert_eq!(stored.stock, original.stock);
        assert_eq!(stored.barcodes, original.barcodes);
    }

    #[tokio::test]
    async fn test_scan_code_lookup() {
        let db = test_db().await;
        let repo = db.products();
        let p = product("Leite 1L", 10, vec!["7891000100103".into(), "LOJA-001".into()]);
        repo.insert(&p).await.unwrap();

        // Any code in the set resolves; unknown codes return None
        let by_ean = repo.get_by_scan_code("7891000100103").await.unwrap();
        assert_eq!(by_ean.map(|p| p.id), Some(p.id.clone()));

        let by_store_code = repo.get_by_scan_code("LOJA-001").await.unwrap();
        assert_eq!(by_store_code.map(|p| p.id), Some(p.id));

        assert!(repo.get_by_scan_code("000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guarded_decrement_applies_once_per_intent() {
        let db = test_db().await;
        let repo = db.products();
        let p = product("Arroz 5kg", 10, vec![]);
        repo.insert(&p).await.unwrap();

        let first = repo
            .decrement_stock_guarded("intent-1", &p.id, Quantity::from_units(3))
            .await
            .unwrap();
        assert!(first);

        // Same intent replayed: guard row blocks a second decrement
        let replay = repo
            .decrement_stock_guarded("intent-1", &p.id, Quantity::from_units(3))
            .await
            .unwrap();
        assert!(!replay);

        let stored = repo.get_by_id(&p.id).await.unwrap();
        assert_eq!(stored.stock, Quantity::from_units(7));

        // A different intent decrements independently
        repo.decrement_stock_guarded("intent-2", &p.id, Quantity::from_units(2))
            .await
            .unwrap();
        let stored = repo.get_by_id(&p.id).await.unwrap();
        assert_eq!(stored.stock, Quantity::from_units(5));
    }

    #[tokio::test]
    async fn test_decrement_clamps_at_zero() {
        let db = test_db().await;
        let repo = db.products();
        let p = product("Última", 1, vec![]);
        repo.insert(&p).await.unwrap();

        repo.decrement_stock_guarded("intent-1", &p.id, Quantity::from_units(5))
            .await
            .unwrap();

        let stored = repo.get_by_id(&p.id).await.unwrap();
        assert_eq!(stored.stock, Quantity::zero());
    }

    #[tokio::test]
    async fn test_update_does_not_touch_stock() {
        let db = test_db().await;
        let repo = db.products();
        let mut p = product("Sabão", 10, vec![]);
        repo.insert(&p).await.unwrap();

        // Concurrent sale moves stock while a catalog edit is in flight
        repo.decrement_stock_guarded("intent-1", &p.id, Quantity::from_units(4))
            .await
            .unwrap();

        p.price = Money::from_cents(1499);
        p.stock = Quantity::from_units(10); // stale value on the edit screen
        repo.update(&p).await.unwrap();

        let stored = repo.get_by_id(&p.id).await.unwrap();
        assert_eq!(stored.price, Money::from_cents(1499));
        assert_eq!(stored.stock, Quantity::from_units(6));
    }

    #[tokio::test]
    async fn test_restock() {
        let db = test_db().await;
        let repo = db.products();
        let p = product("Detergente", 2, vec![]);
        repo.insert(&p).await.unwrap();

        repo.restock(&p.id, Quantity::from_units(24)).await.unwrap();
        let stored = repo.get_by_id(&p.id).await.unwrap();
        assert_eq!(stored.stock, Quantity::from_units(26));
    }
}
