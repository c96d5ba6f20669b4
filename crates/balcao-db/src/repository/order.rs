//! # Order Repository
//!
//! Database operations for the customer order intake queue.
//!
//! ## Guarded Status Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   transition(id, from, to)                                      │
//! │                                                                 │
//! │   UPDATE orders SET status = to                                 │
//! │   WHERE id = ?1 AND status = from                               │
//! │                                                                 │
//! │   rows_affected == 1 ──► this caller won the transition         │
//! │   rows_affected == 0 ──► someone else moved it first (or the    │
//! │                          order is gone) — caller re-reads       │
//! │                                                                 │
//! │   The status check rides in the UPDATE's WHERE clause, so two   │
//! │   staff screens claiming the same pending order race inside     │
//! │   SQLite's write lock and exactly one wins.                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use balcao_core::{Money, Order, OrderStatus, PaymentMethod};

/// Row shape for the `orders` table.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    customer_name: String,
    items: String,
    total_cents: i64,
    payment_method: PaymentMethod,
    payment_proof: Option<Vec<u8>>,
    cash_tendered_cents: Option<i64>,
    change_cents: Option<i64>,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> DbResult<Order> {
        Ok(Order {
            id: self.id,
            customer_name: self.customer_name,
            items: serde_json::from_str(&self.items)?,
            total: Money::from_cents(self.total_cents),
            payment_method: self.payment_method,
            payment_proof: self.payment_proof,
            cash_tendered: self.cash_tendered_cents.map(Money::from_cents),
            change: self.change_cents.map(Money::from_cents),
            status: self.status,
            created_at: self.created_at,
        })
    }
}

const SELECT_ORDER: &str = "SELECT id, customer_name, items, total_cents, payment_method, \
     payment_proof, cash_tendered_cents, change_cents, status, created_at \
     FROM orders";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts a freshly submitted order.
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO orders \
             (id, customer_name, items, total_cents, payment_method, payment_proof, \
              cash_tendered_cents, change_cents, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&order.id)
        .bind(&order.customer_name)
        .bind(serde_json::to_string(&order.items)?)
        .bind(order.total.cents())
        .bind(order.payment_method)
        .bind(&order.payment_proof)
        .bind(order.cash_tendered.map(|m| m.cents()))
        .bind(order.change.map(|m| m.cents()))
        .bind(order.status)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %order.id, customer = %order.customer_name, "Order inserted");
        Ok(())
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        row.into_order()
    }

    /// Lists non-finished orders, oldest first (queue order).
    pub async fn list_open(&self) -> DbResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE status != 'finished' ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    /// Counts orders still awaiting a claim.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = ?1")
            .bind(OrderStatus::Pending)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Attempts the status transition `from → to`.
    ///
    /// ## Returns
    /// * `Ok(true)` - the order was in `from` and is now in `to`
    /// * `Ok(false)` - the order was not in `from` (lost a race, or the
    ///   id does not exist); nothing was written
    pub async fn transition(
        &self,
        id: &str,
        from: OrderStatus,
        to: OrderStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query("UPDATE orders SET status = ?3 WHERE id = ?1 AND status = ?2")
            .bind(id)
            .bind(from)
            .bind(to)
            .execute(&self.pool)
            .await?;

        let won = result.rows_affected() == 1;
        debug!(id = %id, ?from, ?to, won, "Order transition attempted");
        Ok(won)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use balcao_core::SaleItem;
    use balcao_core::Quantity;
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn order(status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4().to_string(),
            customer_name: "Cliente".to_string(),
            items: vec![SaleItem::snapshot(
                "p1",
                "Refrigerante 2L",
                Money::from_cents(999),
                Quantity::from_units(2),
            )],
            total: Money::from_cents(1998),
            payment_method: PaymentMethod::Cash,
            payment_proof: None,
            cash_tendered: Some(Money::from_cents(2000)),
            change: Some(Money::from_cents(2)),
            status,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_roundtrip() {
        let db = test_db().await;
        let repo = db.orders();
        let original = order(OrderStatus::Pending);

        repo.insert(&original).await.unwrap();
        let stored = repo.get_by_id(&original.id).await.unwrap();

        assert_eq!(stored.customer_name, original.customer_name);
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.total, original.total);
        assert_eq!(stored.change, original.change);
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_payment_proof_roundtrip() {
        let db = test_db().await;
        let repo = db.orders();
        let mut o = order(OrderStatus::Pending);
        o.payment_method = PaymentMethod::InstantTransfer;
        o.payment_proof = Some(vec![0xFF, 0xD8, 0xFF, 0xE0]);
        o.cash_tendered = None;
        o.change = None;

        repo.insert(&o).await.unwrap();
        let stored = repo.get_by_id(&o.id).await.unwrap();
        assert_eq!(stored.payment_proof, Some(vec![0xFF, 0xD8, 0xFF, 0xE0]));
    }

    #[tokio::test]
    async fn test_transition_is_guarded_by_current_status() {
        let db = test_db().await;
        let repo = db.orders();
        let o = order(OrderStatus::Pending);
        repo.insert(&o).await.unwrap();

        // First claim wins
        assert!(repo
            .transition(&o.id, OrderStatus::Pending, OrderStatus::Processing)
            .await
            .unwrap());

        // Second claim from Pending loses: the row is no longer Pending
        assert!(!repo
            .transition(&o.id, OrderStatus::Pending, OrderStatus::Processing)
            .await
            .unwrap());

        // Forward to Finished works; moving backward does not
        assert!(repo
            .transition(&o.id, OrderStatus::Processing, OrderStatus::Finished)
            .await
            .unwrap());
        assert!(!repo
            .transition(&o.id, OrderStatus::Finished, OrderStatus::Pending)
            .await
            .unwrap());

        let stored = repo.get_by_id(&o.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Finished);
    }

    #[tokio::test]
    async fn test_list_open_excludes_finished() {
        let db = test_db().await;
        let repo = db.orders();

        let pending = order(OrderStatus::Pending);
        let processing = order(OrderStatus::Processing);
        let finished = order(OrderStatus::Finished);
        repo.insert(&pending).await.unwrap();
        repo.insert(&processing).await.unwrap();
        repo.insert(&finished).await.unwrap();

        let open = repo.list_open().await.unwrap();
        assert_eq!(open.len(), 2);
        assert!(open.iter().all(|o| o.status != OrderStatus::Finished));

        assert_eq!(repo.count_pending().await.unwrap(), 1);
    }
}
