//! # Commit Reconciliation
//!
//! Repair pass over interrupted sale commits.
//!
//! ## What "interrupted" looks like
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  commit_intents                                                 │
//! │  ┌────────────┬──────────┐                                      │
//! │  │ intent #1  │ completed│  ← normal                            │
//! │  │ intent #2  │ failed   │  ← aborted before the header; the    │
//! │  │            │          │    failed mark says nothing landed   │
//! │  │ intent #3  │ pending  │  ← nobody is writing → interrupted   │
//! │  └────────────┴──────────┘                                      │
//! │                                                                 │
//! │  For each stuck pending intent, compare the payload against     │
//! │  what actually landed and replay only the missing steps:        │
//! │                                                                 │
//! │   header missing?      → nothing committed: mark intent Failed  │
//! │   items missing?       → re-insert (OR IGNORE, keyed per line)  │
//! │   movements missing?   → re-apply guarded decrements            │
//! │   ledger debit missing?→ append it (matched by sale reference)  │
//! │   then                 → mark intent Completed                  │
//! │                                                                 │
//! │  Every repair is idempotent, so a reconciler that itself gets   │
//! │  interrupted can simply run again.                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Run at startup, before the engine accepts new checkouts: a pending
//! intent with a live writer would be misread as interrupted.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use balcao_core::{DebtEntryKind, IntentStatus, PaymentMethod};
use balcao_db::{Database, DbError};

use crate::coordinator::credit_debit_entry;
use crate::error::EngineResult;

/// One repair applied to an interrupted commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RepairAction {
    /// The sale header never landed: nothing committed, intent closed
    /// as failed.
    MarkedFailed,
    /// Missing sale line items were re-inserted.
    ReinsertedItems { missing: usize },
    /// Stock decrements without a guard row were applied.
    AppliedDecrements { applied: usize },
    /// The credit sale's ledger debit was missing and was appended.
    AppendedLedgerDebit,
    /// The ledger debit could not be appended because the customer no
    /// longer exists. Reported, not repaired.
    LedgerCustomerMissing,
}

/// Findings and repairs for one interrupted intent.
#[derive(Debug, Clone, Serialize)]
pub struct CommitRepair {
    pub intent_id: String,
    pub sale_id: String,
    pub actions: Vec<RepairAction>,
}

/// Scans for interrupted commits and repairs them.
#[derive(Debug, Clone)]
pub struct Reconciler {
    db: Database,
}

impl Reconciler {
    pub fn new(db: Database) -> Self {
        Reconciler { db }
    }

    /// Repairs every stuck pending intent. Returns one report per
    /// intent touched; an empty report list means a clean ledger.
    pub async fn reconcile(&self) -> EngineResult<Vec<CommitRepair>> {
        let pending = self.db.intents().list_pending().await?;
        let mut reports = Vec::with_capacity(pending.len());

        for intent in pending {
            let mut actions = Vec::new();

            // No header means the commit stopped at or before step 3:
            // nothing downstream can exist, nothing to repair.
            if !self.db.sales().header_exists(&intent.sale_id).await? {
                self.db
                    .intents()
                    .set_status(&intent.id, IntentStatus::Failed)
                    .await?;
                actions.push(RepairAction::MarkedFailed);
                warn!(
                    intent_id = %intent.id,
                    sale_id = %intent.sale_id,
                    "Interrupted commit never wrote its header; marked failed"
                );
                reports.push(CommitRepair {
                    intent_id: intent.id,
                    sale_id: intent.sale_id,
                    actions,
                });
                continue;
            }

            // Items: re-insert is keyed per (sale, product), so lines
            // that landed are left alone.
            let existing = self.db.sales().count_items(&intent.sale_id).await? as usize;
            if existing < intent.items.len() {
                self.db
                    .sales()
                    .insert_items(&intent.sale_id, &intent.items)
                    .await?;
                actions.push(RepairAction::ReinsertedItems {
                    missing: intent.items.len() - existing,
                });
            }

            // Stock: apply only the lines whose guard row never landed.
            let recorded: HashSet<String> = self
                .db
                .intents()
                .recorded_movements(&intent.id)
                .await?
                .into_iter()
                .collect();
            let mut applied = 0;
            for item in &intent.items {
                if recorded.contains(&item.product_id) {
                    continue;
                }
                match self
                    .db
                    .products()
                    .decrement_stock_guarded(&intent.id, &item.product_id, item.quantity)
                    .await
                {
                    Ok(true) => applied += 1,
                    Ok(false) => {}
                    // Product gone since the sale; its guard row now
                    // blocks further replays.
                    Err(DbError::NotFound { .. }) => {
                        warn!(
                            intent_id = %intent.id,
                            product_id = %item.product_id,
                            "Product missing during reconciliation; decrement skipped"
                        );
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            if applied > 0 {
                actions.push(RepairAction::AppliedDecrements { applied });
            }

            // Ledger: a credit sale must have left exactly one debit
            // referencing the sale.
            if intent.payment_method == PaymentMethod::Credit {
                if let Some(customer_id) = &intent.customer_id {
                    match self.db.customers().get_by_id(customer_id).await {
                        Ok(mut customer) => {
                            let already_applied = customer.history.iter().any(|e| {
                                e.kind == DebtEntryKind::Debit
                                    && e.sale_id.as_deref() == Some(intent.sale_id.as_str())
                            });
                            if !already_applied {
                                let total = intent.total();
                                customer.history.push(credit_debit_entry(
                                    &intent.sale_id,
                                    &intent.items,
                                    total,
                                ));
                                customer.debt = customer.debt + total;
                                self.db.customers().apply_ledger_entry(&customer).await?;
                                actions.push(RepairAction::AppendedLedgerDebit);
                            }
                        }
                        Err(DbError::NotFound { .. }) => {
                            warn!(
                                intent_id = %intent.id,
                                customer_id = %customer_id,
                                "Customer missing during reconciliation; debit not appended"
                            );
                            actions.push(RepairAction::LedgerCustomerMissing);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }

            self.db
                .intents()
                .set_status(&intent.id, IntentStatus::Completed)
                .await?;

            info!(
                intent_id = %intent.id,
                sale_id = %intent.sale_id,
                repairs = actions.len(),
                "Interrupted commit reconciled"
            );
            reports.push(CommitRepair {
                intent_id: intent.id,
                sale_id: intent.sale_id,
                actions,
            });
        }

        Ok(reports)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use balcao_core::{
        CommitIntent, Customer, Money, Product, Quantity, Sale, SaleItem, UnitOfMeasure,
    };
    use balcao_db::DbConfig;
    use chrono::Utc;
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            category: "Geral".to_string(),
            price: Money::from_cents(price_cents),
            cost_price: Money::zero(),
            stock: Quantity::from_units(stock),
            min_stock: Quantity::from_units(1),
            unit: UnitOfMeasure::Unit,
            barcodes: vec![],
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        product
    }

    fn intent_for(
        product: &Product,
        quantity: i64,
        payment_method: PaymentMethod,
        customer_id: Option<String>,
    ) -> CommitIntent {
        let now = Utc::now();
        CommitIntent {
            id: Uuid::new_v4().to_string(),
            sale_id: Uuid::new_v4().to_string(),
            items: vec![SaleItem::snapshot(
                &product.id,
                &product.name,
                product.price,
                Quantity::from_units(quantity),
            )],
            payment_method,
            customer_id,
            status: IntentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    async fn write_header(db: &Database, intent: &CommitIntent) {
        db.sales()
            .insert_header(&Sale {
                id: intent.sale_id.clone(),
                created_at: intent.created_at,
                items: intent.items.clone(),
                total: intent.total(),
                payment_method: intent.payment_method,
                customer_id: intent.customer_id.clone(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_headerless_intent_marked_failed() {
        let db = test_db().await;
        let product = seed_product(&db, "Café", 1599, 10).await;

        // Commit died before step 3: only the intent exists
        let intent = intent_for(&product, 2, PaymentMethod::Cash, None);
        db.intents().open(&intent).await.unwrap();

        let reports = Reconciler::new(db.clone()).reconcile().await.unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].actions, vec![RepairAction::MarkedFailed]);
        assert!(db.intents().list_pending().await.unwrap().is_empty());

        // Nothing was replayed
        assert_eq!(db.sales().count().await.unwrap(), 0);
        let stored = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(stored.stock, Quantity::from_units(10));
    }

    #[tokio::test]
    async fn test_repairs_commit_stopped_after_header() {
        let db = test_db().await;
        let product = seed_product(&db, "Arroz", 2499, 10).await;

        // Commit died between steps 3 and 4: header landed, nothing else
        let intent = intent_for(&product, 2, PaymentMethod::Cash, None);
        db.intents().open(&intent).await.unwrap();
        write_header(&db, &intent).await;

        let reports = Reconciler::new(db.clone()).reconcile().await.unwrap();

        assert_eq!(reports.len(), 1);
        assert!(reports[0]
            .actions
            .contains(&RepairAction::ReinsertedItems { missing: 1 }));
        assert!(reports[0]
            .actions
            .contains(&RepairAction::AppliedDecrements { applied: 1 }));

        let sale = db.sales().get_by_id(&intent.sale_id).await.unwrap();
        assert_eq!(sale.items.len(), 1);
        let stored = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(stored.stock, Quantity::from_units(8));
        assert!(db.intents().list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repair_does_not_double_decrement() {
        let db = test_db().await;
        let product = seed_product(&db, "Feijão", 899, 10).await;

        // Commit died after step 5: items landed, stock decremented,
        // ledger/close never ran
        let intent = intent_for(&product, 3, PaymentMethod::Cash, None);
        db.intents().open(&intent).await.unwrap();
        write_header(&db, &intent).await;
        db.sales()
            .insert_items(&intent.sale_id, &intent.items)
            .await
            .unwrap();
        db.products()
            .decrement_stock_guarded(&intent.id, &product.id, Quantity::from_units(3))
            .await
            .unwrap();

        let reports = Reconciler::new(db.clone()).reconcile().await.unwrap();

        // Reconciler closed the intent but applied no decrement again
        assert_eq!(reports.len(), 1);
        assert!(!reports[0]
            .actions
            .iter()
            .any(|a| matches!(a, RepairAction::AppliedDecrements { .. })));
        let stored = db.products().get_by_id(&product.id).await.unwrap();
        assert_eq!(stored.stock, Quantity::from_units(7));
    }

    #[tokio::test]
    async fn test_repairs_missing_credit_debit() {
        let db = test_db().await;
        let product = seed_product(&db, "Açúcar", 1099, 10).await;
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: "Maria".to_string(),
            phone: String::new(),
            debt: Money::zero(),
            history: Vec::new(),
            created_at: Utc::now(),
        };
        db.customers().insert(&customer).await.unwrap();

        // Credit commit died before the ledger write
        let intent = intent_for(&product, 2, PaymentMethod::Credit, Some(customer.id.clone()));
        db.intents().open(&intent).await.unwrap();
        write_header(&db, &intent).await;
        db.sales()
            .insert_items(&intent.sale_id, &intent.items)
            .await
            .unwrap();

        let reports = Reconciler::new(db.clone()).reconcile().await.unwrap();
        assert!(reports[0].actions.contains(&RepairAction::AppendedLedgerDebit));

        let stored = db.customers().get_by_id(&customer.id).await.unwrap();
        assert_eq!(stored.debt.cents(), 2198);
        assert_eq!(stored.history.len(), 1);
        assert_eq!(stored.recompute_debt(), stored.debt);

        // Running again finds nothing to do
        let again = Reconciler::new(db.clone()).reconcile().await.unwrap();
        assert!(again.is_empty());
        let stored = db.customers().get_by_id(&customer.id).await.unwrap();
        assert_eq!(stored.history.len(), 1);
    }
}
