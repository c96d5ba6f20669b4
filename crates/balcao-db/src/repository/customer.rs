//! # Customer Repository
//!
//! Database operations for the customer debt ledger aggregate.
//!
//! ## Single-Write Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  customers row                                                  │
//! │  ┌──────────────┬──────────────────────────────────────────┐    │
//! │  │ debt_cents   │ history (JSON array of ledger entries)   │    │
//! │  └──────────────┴──────────────────────────────────────────┘    │
//! │         ▲                      ▲                                │
//! │         └──────── one UPDATE ──┘                                │
//! │                                                                 │
//! │  The cached balance and the ledger it summarizes live on the    │
//! │  same row and are written by the same statement, so a crash     │
//! │  cannot leave one updated and the other not.                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use balcao_core::{Customer, Money};

/// Row shape for the `customers` table.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    phone: String,
    debt_cents: i64,
    history: String,
    created_at: DateTime<Utc>,
}

impl CustomerRow {
    fn into_customer(self) -> DbResult<Customer> {
        Ok(Customer {
            id: self.id,
            name: self.name,
            phone: self.phone,
            debt: Money::from_cents(self.debt_cents),
            history: serde_json::from_str(&self.history)?,
            created_at: self.created_at,
        })
    }
}

const SELECT_CUSTOMER: &str =
    "SELECT id, name, phone, debt_cents, history, created_at FROM customers";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Lists all customers, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, CustomerRow>(&format!("{SELECT_CUSTOMER} ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(CustomerRow::into_customer).collect()
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Customer> {
        let row = sqlx::query_as::<_, CustomerRow>(&format!("{SELECT_CUSTOMER} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))?;

        row.into_customer()
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO customers (id, name, phone, debt_cents, history, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(customer.debt.cents())
        .bind(serde_json::to_string(&customer.history)?)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %customer.id, name = %customer.name, "Customer inserted");
        Ok(())
    }

    /// Writes a customer's new balance and full ledger history in one
    /// statement.
    ///
    /// The caller (the coordinator) appends the new entry and computes
    /// the clamped balance; this method only persists the resulting
    /// aggregate state atomically.
    pub async fn apply_ledger_entry(&self, customer: &Customer) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE customers SET debt_cents = ?2, history = ?3 WHERE id = ?1",
        )
        .bind(&customer.id)
        .bind(customer.debt.cents())
        .bind(serde_json::to_string(&customer.history)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", &customer.id));
        }

        debug!(
            id = %customer.id,
            debt = %customer.debt,
            entries = customer.history.len(),
            "Ledger updated"
        );
        Ok(())
    }

    /// Deletes a customer and their entire ledger.
    ///
    /// Sale records referencing the customer are kept; the foreign key
    /// nulls out on delete. The typed-name confirmation gate lives in
    /// the engine, not here.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        debug!(id = %id, "Customer deleted");
        Ok(())
    }

    /// Counts customers (for diagnostics and seed checks).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
