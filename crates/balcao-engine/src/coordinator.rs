//! # Transaction Coordinator
//!
//! The heart of the engine: turning a cart into a committed sale across
//! three independently-persisted aggregates, with no multi-object
//! transaction primitive underneath.
//!
//! ## The Commit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  complete_sale(request)                                         │
//! │                                                                 │
//! │  0. Validate (empty cart? bad line? credit w/o customer?)       │
//! │  1. Total = Σ line totals (lines checked consistent)            │
//! │  2. Open CommitIntent          ─┐ write-ahead record            │
//! │  3. Insert sale header          │                               │
//! │  4. Insert sale items           │ each step a single-aggregate  │
//! │  5. Decrement stock per line    │ write, awaited in order       │
//! │  6. Credit? append ledger debit │                               │
//! │  7. Order? Processing→Finished  │                               │
//! │  8. Mark intent Completed      ─┘                               │
//! │     Refresh read model (also on late-stage failure)             │
//! │                                                                 │
//! │  Failure before step 3: nothing committed, clean abort.         │
//! │  Failure at/after step 4: partial state, surfaced as a          │
//! │  CommitError naming the stage; the intent stays Pending and     │
//! │  the Reconciler can replay the remainder idempotently.          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock decrements (step 5) are applied per line, each clamped at
//! zero and guarded by a movement row keyed on (intent, product). A
//! failed line does not block the others; the first failure is
//! surfaced after every line has been attempted.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use balcao_core::validation::{
    validate_name, validate_payment_amount, validate_price, validate_quantity, validate_scan_code,
};
use balcao_core::{
    checked_cart_total, CommitIntent, CoreError, Customer, DebtEntry, DebtEntryKind, IntentStatus,
    Money, Order, OrderStatus, Product, Quantity, Sale, SaleItem, UnitOfMeasure, ValidationError,
};
use balcao_db::{Database, DbError};

use crate::error::{CommitStage, EngineError, EngineResult};
use crate::read_model::ReadModelCache;

// =============================================================================
// Requests
// =============================================================================

/// A checkout to be committed.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Commit-time line snapshots (usually from [`Cart::to_sale_items`]).
    ///
    /// [`Cart::to_sale_items`]: balcao_core::Cart::to_sale_items
    pub items: Vec<SaleItem>,
    pub payment_method: balcao_core::PaymentMethod,
    /// Required iff `payment_method` is Credit.
    pub customer_id: Option<String>,
    /// Set when the cart was seeded from a claimed customer order; the
    /// order is finished as part of the commit.
    pub order_id: Option<String>,
}

/// Fields for a new catalog entry.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub category: String,
    pub price: Money,
    pub cost_price: Money,
    pub stock: Quantity,
    pub min_stock: Quantity,
    pub unit: UnitOfMeasure,
    pub barcodes: Vec<String>,
}

// =============================================================================
// Coordinator
// =============================================================================

/// Sequences multi-aggregate writes and keeps the read model fresh.
#[derive(Debug, Clone)]
pub struct TransactionCoordinator {
    db: Database,
    cache: ReadModelCache,
}

impl TransactionCoordinator {
    pub fn new(db: Database, cache: ReadModelCache) -> Self {
        TransactionCoordinator { db, cache }
    }

    // -------------------------------------------------------------------------
    // Checkout
    // -------------------------------------------------------------------------

    /// Commits a sale. See the module docs for the full sequence.
    pub async fn complete_sale(&self, request: CheckoutRequest) -> EngineResult<Sale> {
        // Step 0: validation, before any write
        if request.items.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        // A non-positive quantity would invert the stock decrement
        for item in &request.items {
            validate_quantity(item.quantity)?;
        }
        let total = checked_cart_total(&request.items)?;

        let customer = if request.payment_method.requires_customer() {
            let id = request
                .customer_id
                .as_deref()
                .ok_or(CoreError::CustomerRequired)?;
            Some(self.fetch_customer(id).await?)
        } else {
            None
        };

        // Step 2: write-ahead intent. Failure here is a clean abort.
        let now = Utc::now();
        let intent = CommitIntent {
            id: Uuid::new_v4().to_string(),
            sale_id: Uuid::new_v4().to_string(),
            items: request.items.clone(),
            payment_method: request.payment_method,
            customer_id: request.customer_id.clone(),
            status: IntentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.db
            .intents()
            .open(&intent)
            .await
            .map_err(|e| EngineError::commit(CommitStage::Intent, e))?;

        let sale = Sale {
            id: intent.sale_id.clone(),
            created_at: now,
            items: request.items,
            total,
            payment_method: request.payment_method,
            customer_id: request.customer_id,
        };

        let outcome = self
            .run_commit(&intent, &sale, customer, request.order_id.as_deref())
            .await;

        // Step 8 tail: refresh even after a partial commit, so views
        // observe persisted ground truth rather than pre-commit state.
        self.refresh_after_write().await;

        outcome.map(|_| sale)
    }

    /// Steps 3-8 of the commit sequence. Caller refreshes the read
    /// model regardless of the outcome.
    async fn run_commit(
        &self,
        intent: &CommitIntent,
        sale: &Sale,
        customer: Option<Customer>,
        order_id: Option<&str>,
    ) -> EngineResult<()> {
        // Step 3: sale header
        if let Err(e) = self.db.sales().insert_header(sale).await {
            // Nothing committed. Close the intent so the reconciler
            // knows there is nothing to repair.
            if let Err(close_err) = self
                .db
                .intents()
                .set_status(&intent.id, IntentStatus::Failed)
                .await
            {
                warn!(intent_id = %intent.id, error = %close_err, "Failed to mark aborted intent");
            }
            return Err(EngineError::commit(CommitStage::SaleHeader, e));
        }

        // Step 4: sale items. A failure leaves an orphaned header; the
        // intent stays Pending for the reconciler.
        self.db
            .sales()
            .insert_items(&sale.id, &sale.items)
            .await
            .map_err(|e| EngineError::commit(CommitStage::SaleItems, e))?;

        // Step 5: per-line guarded stock decrements, all attempted
        let mut first_failure: Option<DbError> = None;
        for item in &sale.items {
            if let Err(e) = self
                .db
                .products()
                .decrement_stock_guarded(&intent.id, &item.product_id, item.quantity)
                .await
            {
                warn!(product_id = %item.product_id, error = %e, "Stock decrement failed");
                first_failure.get_or_insert(e);
            }
        }
        if let Some(e) = first_failure {
            return Err(EngineError::commit(CommitStage::StockDecrement, e));
        }

        // Step 6: credit sales append a ledger debit, balance and
        // history in one aggregate write
        if let Some(mut customer) = customer {
            customer
                .history
                .push(credit_debit_entry(&sale.id, &sale.items, sale.total));
            customer.debt = customer.debt + sale.total;
            self.db
                .customers()
                .apply_ledger_entry(&customer)
                .await
                .map_err(|e| EngineError::commit(CommitStage::Ledger, e))?;
        }

        // Step 7: finish the originating order, if any
        if let Some(order_id) = order_id {
            self.finish_order(order_id).await?;
        }

        // Step 8: close the intent
        self.db
            .intents()
            .set_status(&intent.id, IntentStatus::Completed)
            .await
            .map_err(|e| EngineError::commit(CommitStage::IntentClose, e))?;

        info!(
            sale_id = %sale.id,
            total = %sale.total,
            method = ?sale.payment_method,
            lines = sale.items.len(),
            "Sale committed"
        );
        Ok(())
    }

    /// Processing → Finished for the order a claimed cart came from.
    async fn finish_order(&self, order_id: &str) -> EngineResult<()> {
        let moved = self
            .db
            .orders()
            .transition(order_id, OrderStatus::Processing, OrderStatus::Finished)
            .await
            .map_err(|e| EngineError::commit(CommitStage::OrderFinish, e))?;

        if !moved {
            let order: Order = self
                .db
                .orders()
                .get_by_id(order_id)
                .await
                .map_err(|e| EngineError::commit(CommitStage::OrderFinish, e))?;
            return Err(CoreError::InvalidOrderTransition {
                from: order.status,
                to: OrderStatus::Finished,
            }
            .into());
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Debt payments
    // -------------------------------------------------------------------------

    /// Records a payment against a customer's debt.
    ///
    /// The balance is clamped at zero; an over-payment is recorded in
    /// the ledger verbatim but does not create negative debt.
    pub async fn record_payment(&self, customer_id: &str, amount: Money) -> EngineResult<Customer> {
        validate_payment_amount(amount)?;

        let mut customer = self.fetch_customer(customer_id).await?;
        customer.history.push(DebtEntry {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            description: "Pagamento".to_string(),
            amount,
            kind: DebtEntryKind::Payment,
            sale_id: None,
            items: None,
        });
        customer.debt = customer.debt.saturating_sub(amount);

        self.db.customers().apply_ledger_entry(&customer).await?;
        self.refresh_after_write().await;

        info!(
            customer_id = %customer.id,
            amount = %amount,
            new_debt = %customer.debt,
            "Payment recorded"
        );
        Ok(customer)
    }

    // -------------------------------------------------------------------------
    // Catalog management
    // -------------------------------------------------------------------------

    /// Adds a product to the catalog.
    pub async fn add_product(&self, draft: ProductDraft) -> EngineResult<Product> {
        validate_name("name", &draft.name)?;
        validate_price(draft.price)?;
        for code in &draft.barcodes {
            validate_scan_code(code)?;
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: draft.name.trim().to_string(),
            category: draft.category,
            price: draft.price,
            cost_price: draft.cost_price,
            stock: draft.stock,
            min_stock: draft.min_stock,
            unit: draft.unit,
            barcodes: draft.barcodes,
            created_at: now,
            updated_at: now,
        };

        self.db.products().insert(&product).await?;
        self.refresh_after_write().await;
        Ok(product)
    }

    /// Updates a product's catalog fields (not its stock).
    pub async fn update_product(&self, product: &Product) -> EngineResult<()> {
        validate_name("name", &product.name)?;
        validate_price(product.price)?;
        for code in &product.barcodes {
            validate_scan_code(code)?;
        }

        self.db.products().update(product).await?;
        self.refresh_after_write().await;
        Ok(())
    }

    /// Registers received stock for a product.
    pub async fn restock_product(&self, product_id: &str, delta: Quantity) -> EngineResult<Product> {
        if !delta.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "restock quantity".to_string(),
            }
            .into());
        }

        self.db.products().restock(product_id, delta).await?;
        self.refresh_after_write().await;

        let product = self.db.products().get_by_id(product_id).await?;
        info!(product_id = %product.id, stock = %product.stock, "Product restocked");
        Ok(product)
    }

    /// Looks up a product by a scanned code. A scan string is purely a
    /// lookup key; an unknown code is `Ok(None)`, not an error.
    pub async fn lookup_by_scan_code(&self, code: &str) -> EngineResult<Option<Product>> {
        validate_scan_code(code)?;
        Ok(self.db.products().get_by_scan_code(code).await?)
    }

    // -------------------------------------------------------------------------
    // Customer management
    // -------------------------------------------------------------------------

    /// Registers a new credit customer with an empty ledger.
    pub async fn add_customer(&self, name: &str, phone: &str) -> EngineResult<Customer> {
        validate_name("name", name)?;

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            phone: phone.trim().to_string(),
            debt: Money::zero(),
            history: Vec::new(),
            created_at: Utc::now(),
        };

        self.db.customers().insert(&customer).await?;
        self.refresh_after_write().await;
        Ok(customer)
    }

    /// Deletes a customer and their entire ledger.
    ///
    /// `typed_name` must match the customer's name exactly — deliberate
    /// friction before a destructive operation. Outstanding debt does
    /// not block deletion; the typed name is the only gate.
    pub async fn delete_customer(&self, customer_id: &str, typed_name: &str) -> EngineResult<()> {
        let customer = self.fetch_customer(customer_id).await?;

        if typed_name.trim() != customer.name {
            return Err(ValidationError::ConfirmationMismatch.into());
        }

        self.db.customers().delete(customer_id).await?;
        self.refresh_after_write().await;

        info!(customer_id = %customer_id, "Customer deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Refreshes the read model after an aggregate write has landed.
    ///
    /// A refresh failure is downgraded to a warning: the write is
    /// durable, so the operation must not report failure. Views catch
    /// up on the next successful refresh.
    async fn refresh_after_write(&self) {
        if let Err(refresh_err) = self.cache.refresh().await {
            warn!(error = %refresh_err, "Read model refresh failed after write");
        }
    }

    async fn fetch_customer(&self, id: &str) -> EngineResult<Customer> {
        match self.db.customers().get_by_id(id).await {
            Ok(customer) => Ok(customer),
            Err(DbError::NotFound { .. }) => {
                Err(CoreError::CustomerNotFound(id.to_string()).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Builds the ledger debit for a committed credit sale, carrying the
/// sale reference and item snapshot for audit display.
pub(crate) fn credit_debit_entry(sale_id: &str, items: &[SaleItem], total: Money) -> DebtEntry {
    DebtEntry {
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        description: format!("Compra fiado ({} itens)", items.len()),
        amount: total,
        kind: DebtEntryKind::Debit,
        sale_id: Some(sale_id.to_string()),
        items: Some(items.to_vec()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
