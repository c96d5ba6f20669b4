//! # Domain Types
//!
//! Core domain types for the Balcão POS.
//!
//! ## The Three Aggregates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ┌───────────────┐  ┌───────────────┐  ┌───────────────┐        │
//! │  │    Product    │  │     Sale      │  │   Customer    │        │
//! │  │  ───────────  │  │  ───────────  │  │  ───────────  │        │
//! │  │  id (UUID)    │  │  id (UUID)    │  │  id (UUID)    │        │
//! │  │  price        │  │  items        │  │  debt         │        │
//! │  │  stock ≥ 0    │  │  total        │  │  history      │        │
//! │  │  barcodes     │  │  immutable    │  │  append-only  │        │
//! │  └───────────────┘  └───────────────┘  └───────────────┘        │
//! │                                                                 │
//! │  Each aggregate is persisted independently. A committed sale    │
//! │  touches all three with no multi-object transaction; the        │
//! │  CommitIntent below is the write-ahead record that makes a      │
//! │  partial commit detectable afterwards.                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! Sale items and debt entries copy product name and price at commit
//! time. History stays displayable even after the product is renamed,
//! repriced, or removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Unit of Measure
// =============================================================================

/// How a product's stock is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UnitOfMeasure {
    /// Whole units (cans, packets).
    Unit,
    /// Weighted goods, quantity in grams.
    Weight,
}

impl Default for UnitOfMeasure {
    fn default() -> Self {
        UnitOfMeasure::Unit
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown at the register and copied onto sale items.
    pub name: String,

    /// Free-form category (e.g. "Bebidas").
    pub category: String,

    /// Unit price in centavos.
    pub price: Money,

    /// Cost price in centavos, for margin reporting.
    pub cost_price: Money,

    /// Quantity on hand. Never negative at any observable time: a commit
    /// that would drive it below zero is clamped to zero, not rejected.
    pub stock: Quantity,

    /// Reorder threshold for low-stock surfacing.
    pub min_stock: Quantity,

    /// Whether stock is counted in units or grams.
    pub unit: UnitOfMeasure,

    /// Scan codes associated with this product. A scan string is purely
    /// a lookup key against this set.
    pub barcodes: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks whether any stock remains.
    #[inline]
    pub fn in_stock(&self) -> bool {
        self.stock.is_positive()
    }

    /// Checks whether stock has fallen to or below the reorder threshold.
    #[inline]
    pub fn is_below_reorder(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Checks whether a scan code belongs to this product.
    pub fn matches_scan_code(&self, code: &str) -> bool {
        self.barcodes.iter().any(|b| b == code)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash.
    Cash,
    /// Card on an external terminal.
    Card,
    /// Instant bank transfer (Pix).
    InstantTransfer,
    /// Credit sale ("fiado"): recorded as owed by a customer.
    Credit,
}

impl PaymentMethod {
    /// A credit sale must reference an existing customer.
    #[inline]
    pub fn requires_customer(&self) -> bool {
        matches!(self, PaymentMethod::Credit)
    }

    /// Self-service orders paid by transfer or credit must attach proof.
    #[inline]
    pub fn requires_payment_proof(&self) -> bool {
        matches!(self, PaymentMethod::InstantTransfer | PaymentMethod::Credit)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
///
/// Uses the snapshot pattern: name and unit price are copied from the
/// product at commit time, and `total` is fixed at creation — it is
/// never recomputed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    /// Product this line referenced at time of sale.
    pub product_id: String,

    /// Product name at time of sale (frozen).
    pub name: String,

    /// Unit price at time of sale (frozen).
    pub price: Money,

    /// Quantity sold.
    pub quantity: Quantity,

    /// Extended total, `price × quantity` at creation.
    pub total: Money,
}

impl SaleItem {
    /// Builds a line item snapshot, computing the extended total.
    pub fn snapshot(product_id: &str, name: &str, price: Money, quantity: Quantity) -> Self {
        SaleItem {
            product_id: product_id.to_string(),
            name: name.to_string(),
            price,
            quantity,
            total: price.extend(quantity),
        }
    }

    /// Checks the line invariant `total == price × quantity`.
    pub fn is_consistent(&self) -> bool {
        self.total == self.price.extend(self.quantity)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale. Immutable once created: never edited, never
/// deleted, only superseded by later sales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<SaleItem>,
    /// Sum of item totals.
    pub total: Money,
    pub payment_method: PaymentMethod,
    /// Required iff `payment_method` is Credit.
    pub customer_id: Option<String>,
}

// =============================================================================
// Debt Ledger
// =============================================================================

/// Direction of a debt ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebtEntryKind {
    /// A credit sale increasing the balance.
    Debit,
    /// A payment decreasing the balance (clamped at zero).
    Payment,
}

/// One append-only entry in a customer's debt ledger.
///
/// Entries carry enough denormalized data (the item snapshot) to be
/// displayed without joining back to the originating sale, whose
/// products may since have been renamed or removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub amount: Money,
    pub kind: DebtEntryKind,
    /// Originating sale, for debits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<String>,
    /// Item snapshot of the sale that generated the debit, for audit
    /// display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<SaleItem>>,
}

// =============================================================================
// Customer
// =============================================================================

/// A credit customer with a running debt balance backed by an
/// append-only entry history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    /// Cached running balance. Invariant: equals the history folded in
    /// order, with payments clamped at zero (see [`Customer::recompute_debt`]).
    pub debt: Money,
    /// Ordered entry log, oldest first. Never reordered or deleted.
    pub history: Vec<DebtEntry>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Folds the ledger history into a balance, applying the same
    /// payment clamp the coordinator applies at write time.
    pub fn recompute_debt(&self) -> Money {
        self.history.iter().fold(Money::zero(), |bal, e| match e.kind {
            DebtEntryKind::Debit => bal + e.amount,
            DebtEntryKind::Payment => bal.saturating_sub(e.amount),
        })
    }

    /// History for display, most recent first.
    pub fn history_desc(&self) -> Vec<&DebtEntry> {
        let mut entries: Vec<&DebtEntry> = self.history.iter().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries
    }
}

// =============================================================================
// Order Intake
// =============================================================================

/// Lifecycle state of a customer-submitted order.
///
/// The state machine is linear and forward-only:
/// `pending → processing → finished`. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Submitted by a customer, awaiting staff action.
    Pending,
    /// Claimed by staff, exclusively actionable by staff.
    Processing,
    /// Checked out. Terminal.
    Finished,
}

impl OrderStatus {
    /// Whether the status permits a transition to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Processing)
                | (OrderStatus::Processing, OrderStatus::Finished)
        )
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Finished)
    }
}

/// A customer-submitted order awaiting staff processing.
///
/// The submitted customer name is free text, not linked to a
/// [`Customer`] identity. Item quantities are as requested at
/// submission time and are not re-validated against stock until the
/// order is claimed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub items: Vec<SaleItem>,
    /// Total declared at submission.
    pub total: Money,
    pub payment_method: PaymentMethod,
    /// Opaque payment proof attachment (e.g. a transfer receipt image).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_proof: Option<Vec<u8>>,
    /// For cash orders: amount the customer will tender.
    pub cash_tendered: Option<Money>,
    /// For cash orders: change computed at submission.
    pub change: Option<Money>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Commit Intent
// =============================================================================

/// Outcome state of a write-ahead commit intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    /// Commit sequence in flight, or stopped partway.
    Pending,
    /// Every step landed.
    Completed,
    /// Nothing downstream happened; safe to ignore.
    Failed,
}

/// Write-ahead record opened before a sale commit touches any
/// aggregate.
///
/// The commit is a short-lived saga, not a transaction: if the process
/// stops partway, the intent stays `Pending` and the reconciliation
/// pass can compare the payload against what actually landed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitIntent {
    pub id: String,
    /// Sale id the commit will create.
    pub sale_id: String,
    /// The cart being committed, serialized for later comparison.
    pub items: Vec<SaleItem>,
    pub payment_method: PaymentMethod,
    pub customer_id: Option<String>,
    pub status: IntentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommitIntent {
    /// Total the committed sale must carry.
    pub fn total(&self) -> Money {
        self.items.iter().map(|i| i.total).sum()
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// Sums line totals and checks each line's internal consistency.
///
/// Returns the cart total, or the first inconsistent line's product id.
pub fn checked_cart_total(items: &[SaleItem]) -> Result<Money, CoreError> {
    for item in items {
        if !item.is_consistent() {
            return Err(CoreError::InconsistentLine {
                product_id: item.product_id.clone(),
            });
        }
    }
    Ok(items.iter().map(|i| i.total).sum())
}
