//! # Commit Intent Repository
//!
//! Database operations for the write-ahead commit records and their
//! stock-movement guard rows.
//!
//! An intent is opened before the first aggregate write of a sale
//! commit and closed (`completed` / `failed`) after the last. Whatever
//! is still `pending` when nobody is writing marks an interrupted
//! commit for the reconciler.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use balcao_core::{CommitIntent, IntentStatus, PaymentMethod};

/// Row shape for the `commit_intents` table.
#[derive(Debug, sqlx::FromRow)]
struct IntentRow {
    id: String,
    sale_id: String,
    items: String,
    payment_method: PaymentMethod,
    customer_id: Option<String>,
    status: IntentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IntentRow {
    fn into_intent(self) -> DbResult<CommitIntent> {
        Ok(CommitIntent {
            id: self.id,
            sale_id: self.sale_id,
            items: serde_json::from_str(&self.items)?,
            payment_method: self.payment_method,
            customer_id: self.customer_id,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for commit-intent database operations.
#[derive(Debug, Clone)]
pub struct IntentRepository {
    pool: SqlitePool,
}

impl IntentRepository {
    /// Creates a new IntentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        IntentRepository { pool }
    }

    /// Opens a write-ahead intent. Must land before any aggregate write
    /// of the commit sequence.
    pub async fn open(&self, intent: &CommitIntent) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO commit_intents \
             (id, sale_id, items, payment_method, customer_id, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&intent.id)
        .bind(&intent.sale_id)
        .bind(serde_json::to_string(&intent.items)?)
        .bind(intent.payment_method)
        .bind(&intent.customer_id)
        .bind(intent.status)
        .bind(intent.created_at)
        .bind(intent.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %intent.id, sale_id = %intent.sale_id, "Commit intent opened");
        Ok(())
    }

    /// Closes (or re-marks) an intent.
    pub async fn set_status(&self, id: &str, status: IntentStatus) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE commit_intents SET status = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(status)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CommitIntent", id));
        }

        debug!(id = %id, ?status, "Commit intent status set");
        Ok(())
    }

    /// Lists intents still marked pending, oldest first.
    pub async fn list_pending(&self) -> DbResult<Vec<CommitIntent>> {
        let rows = sqlx::query_as::<_, IntentRow>(
            "SELECT id, sale_id, items, payment_method, customer_id, status, \
             created_at, updated_at \
             FROM commit_intents WHERE status = 'pending' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(IntentRow::into_intent).collect()
    }

    /// Product ids whose stock decrement already has a guard row for
    /// this intent. The reconciler uses this to replay only the lines
    /// that never landed.
    pub async fn recorded_movements(&self, intent_id: &str) -> DbResult<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT product_id FROM stock_movements WHERE intent_id = ?1")
                .bind(intent_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
