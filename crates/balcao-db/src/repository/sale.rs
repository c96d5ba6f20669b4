//! # Sale Repository
//!
//! Database operations for the sale record aggregate: an immutable
//! header row plus its line items.
//!
//! ## Idempotent Line Inserts
//! Lines are keyed `(sale_id, product_id)` — the cart merges duplicate
//! products, so the pair is unique — and inserted with `OR IGNORE`.
//! A replayed commit sequence re-inserting lines that already landed is
//! a no-op instead of a constraint failure.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{DbError, DbResult};
use balcao_core::{Money, PaymentMethod, Quantity, Sale, SaleItem};

/// Row shape for the `sales` header table.
#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    total_cents: i64,
    payment_method: PaymentMethod,
    customer_id: Option<String>,
    created_at: DateTime<Utc>,
}

/// Row shape for the `sale_items` table.
#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    sale_id: String,
    product_id: String,
    name: String,
    price_cents: i64,
    quantity_milli: i64,
    total_cents: i64,
}

impl SaleItemRow {
    fn into_item(self) -> SaleItem {
        SaleItem {
            product_id: self.product_id,
            name: self.name,
            price: Money::from_cents(self.price_cents),
            quantity: Quantity::from_milli(self.quantity_milli),
            total: Money::from_cents(self.total_cents),
        }
    }
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts the sale header row. Items are written separately by
    /// [`insert_items`](Self::insert_items).
    pub async fn insert_header(&self, sale: &Sale) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO sales (id, total_cents, payment_method, customer_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&sale.id)
        .bind(sale.total.cents())
        .bind(sale.payment_method)
        .bind(&sale.customer_id)
        .bind(sale.created_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %sale.id, total = %sale.total, "Sale header inserted");
        Ok(())
    }

    /// Inserts sale line items. Idempotent: lines that already exist
    /// for this sale are left untouched.
    pub async fn insert_items(&self, sale_id: &str, items: &[SaleItem]) -> DbResult<()> {
        for item in items {
            sqlx::query(
                "INSERT OR IGNORE INTO sale_items \
                 (sale_id, product_id, name, price_cents, quantity_milli, total_cents) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(sale_id)
            .bind(&item.product_id)
            .bind(&item.name)
            .bind(item.price.cents())
            .bind(item.quantity.milli())
            .bind(item.total.cents())
            .execute(&self.pool)
            .await?;
        }

        debug!(sale_id = %sale_id, count = items.len(), "Sale items inserted");
        Ok(())
    }

    /// Whether the header row for a sale exists. Used by the
    /// reconciler to find out how far an interrupted commit got.
    pub async fn header_exists(&self, sale_id: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE id = ?1")
            .bind(sale_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Counts the line items stored for a sale.
    pub async fn count_items(&self, sale_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE sale_id = ?1")
            .bind(sale_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Gets a sale with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Sale> {
        let header = sqlx::query_as::<_, SaleRow>(
            "SELECT id, total_cents, payment_method, customer_id, created_at \
             FROM sales WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Sale", id))?;

        let items = sqlx::query_as::<_, SaleItemRow>(
            "SELECT sale_id, product_id, name, price_cents, quantity_milli, total_cents \
             FROM sale_items WHERE sale_id = ?1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Sale {
            id: header.id,
            created_at: header.created_at,
            items: items.into_iter().map(SaleItemRow::into_item).collect(),
            total: Money::from_cents(header.total_cents),
            payment_method: header.payment_method,
            customer_id: header.customer_id,
        })
    }

    /// Lists sales with their items, most recent first.
    ///
    /// Two queries (headers, then all lines for those headers) grouped
    /// in memory, rather than one query per sale.
    pub async fn list_with_items(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let headers = sqlx::query_as::<_, SaleRow>(
            "SELECT id, total_cents, payment_method, customer_id, created_at \
             FROM sales ORDER BY created_at DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let item_rows = sqlx::query_as::<_, SaleItemRow>(
            "SELECT i.sale_id, i.product_id, i.name, i.price_cents, i.quantity_milli, i.total_cents \
             FROM sale_items i \
             JOIN (SELECT id FROM sales ORDER BY created_at DESC LIMIT ?1) s \
               ON s.id = i.sale_id",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut items_by_sale: HashMap<String, Vec<SaleItem>> = HashMap::new();
        for row in item_rows {
            items_by_sale
                .entry(row.sale_id.clone())
                .or_default()
                .push(row.into_item());
        }

        Ok(headers
            .into_iter()
            .map(|h| Sale {
                items: items_by_sale.remove(&h.id).unwrap_or_default(),
                id: h.id,
                created_at: h.created_at,
                total: Money::from_cents(h.total_cents),
                payment_method: h.payment_method,
                customer_id: h.customer_id,
            })
            .collect())
    }

    /// Counts sales (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
