//! # Read-Model Cache
//!
//! A full-snapshot cache serving every read surface (catalog, customer
//! list, sale history). Mutating operations refetch all three
//! collections after their writes land; reads are a cheap `Arc` clone.
//!
//! ## Consistency Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  mutate ──► repositories ──► refresh() ──► swap Arc<Snapshot>   │
//! │                                                                 │
//! │  Read-your-writes: once a mutating call's future resolves, the  │
//! │  next snapshot() observes its effect.                           │
//! │                                                                 │
//! │  NOT snapshot isolation: a refresh triggered by session A is    │
//! │  observed by session B. Views always show persisted ground      │
//! │  truth, never an in-flight intermediate.                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use balcao_core::{Customer, Product, Sale};
use balcao_db::Database;

use crate::error::EngineResult;

/// How many recent sales the snapshot carries.
const RECENT_SALES_LIMIT: u32 = 500;

/// One coherent view of the three aggregates.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Catalog, sorted by name.
    pub products: Vec<Product>,
    /// Customers, sorted by name.
    pub customers: Vec<Customer>,
    /// Recent sales, most recent first.
    pub sales: Vec<Sale>,
    /// When this snapshot was fetched. `None` only before the first
    /// refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Products at or below their reorder threshold.
    pub fn low_stock_products(&self) -> Vec<&Product> {
        self.products.iter().filter(|p| p.is_below_reorder()).collect()
    }

    pub fn find_product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn find_customer(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }
}

/// Shared, refetch-on-mutation snapshot cache.
///
/// Cloning shares the underlying snapshot: every clone observes every
/// refresh.
#[derive(Debug, Clone)]
pub struct ReadModelCache {
    db: Database,
    current: Arc<RwLock<Arc<Snapshot>>>,
}

impl ReadModelCache {
    /// Creates an empty cache. Call [`refresh`](Self::refresh) (or run
    /// any mutating operation) to populate it.
    pub fn new(db: Database) -> Self {
        ReadModelCache {
            db,
            current: Arc::new(RwLock::new(Arc::new(Snapshot::default()))),
        }
    }

    /// Refetches all three collections and swaps the snapshot in.
    ///
    /// Idempotent: refreshing twice with no intervening writes yields
    /// an equivalent snapshot. The fetches run outside the write lock,
    /// which is held only for the pointer swap.
    pub async fn refresh(&self) -> EngineResult<()> {
        let products = self.db.products().list().await?;
        let customers = self.db.customers().list().await?;
        let sales = self.db.sales().list_with_items(RECENT_SALES_LIMIT).await?;

        debug!(
            products = products.len(),
            customers = customers.len(),
            sales = sales.len(),
            "Read model refreshed"
        );

        let snapshot = Arc::new(Snapshot {
            products,
            customers,
            sales,
            refreshed_at: Some(Utc::now()),
        });

        *self.current.write().await = snapshot;
        Ok(())
    }

    /// Returns the current snapshot. Cheap: clones an `Arc`.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balcao_core::{Money, Quantity, UnitOfMeasure};
    use balcao_db::DbConfig;
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn product(name: &str, stock: i64, min_stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category: "Geral".to_string(),
            price: Money::from_cents(1000),
            cost_price: Money::from_cents(700),
            stock: Quantity::from_units(stock),
            min_stock: Quantity::from_units(min_stock),
            unit: UnitOfMeasure::Unit,
            barcodes: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_refresh_populates_snapshot() {
        let db = test_db().await;
        db.products().insert(&product("Café", 10, 2)).await.unwrap();

        let cache = ReadModelCache::new(db);
        assert!(cache.snapshot().await.refreshed_at.is_none());

        cache.refresh().await.unwrap();
        let snap = cache.snapshot().await;
        assert_eq!(snap.products.len(), 1);
        assert!(snap.refreshed_at.is_some());
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let db = test_db().await;
        db.products().insert(&product("Arroz", 5, 1)).await.unwrap();

        let cache = ReadModelCache::new(db);
        cache.refresh().await.unwrap();
        let first = cache.snapshot().await;

        cache.refresh().await.unwrap();
        let second = cache.snapshot().await;

        assert_eq!(first.products.len(), second.products.len());
        assert_eq!(first.customers.len(), second.customers.len());
        assert_eq!(first.sales.len(), second.sales.len());
    }

    #[tokio::test]
    async fn test_low_stock_products() {
        let db = test_db().await;
        db.products().insert(&product("Cheio", 50, 5)).await.unwrap();
        db.products().insert(&product("Baixo", 2, 5)).await.unwrap();

        let cache = ReadModelCache::new(db);
        cache.refresh().await.unwrap();

        let snap = cache.snapshot().await;
        let low = snap.low_stock_products();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "Baixo");
    }

    #[tokio::test]
    async fn test_clones_share_refreshes() {
        let db = test_db().await;
        let cache = ReadModelCache::new(db.clone());
        let other = cache.clone();

        db.products().insert(&product("Leite", 10, 2)).await.unwrap();
        cache.refresh().await.unwrap();

        assert_eq!(other.snapshot().await.products.len(), 1);
    }
}
