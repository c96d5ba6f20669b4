//! # Error Types
//!
//! Domain-specific error types for balcao-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  balcao-core errors (this file)                                 │
//! │  ├── CoreError        - Business rule violations                │
//! │  └── ValidationError  - Input validation failures               │
//! │                                                                 │
//! │  balcao-db errors                                               │
//! │  └── DbError          - Persistence failures                    │
//! │                                                                 │
//! │  balcao-engine errors                                           │
//! │  └── EngineError      - Validation vs. Commit taxonomy;         │
//! │                         a CommitError names the stage at        │
//! │                         which the multi-write sequence stopped  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derive macros, never manual impls
//! 2. Context in the message (product id, status, ...)
//! 3. Enum variants, never bare strings

use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and domain logic failures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// A credit sale was attempted without a customer reference.
    #[error("Credit sale requires a customer")]
    CustomerRequired,

    /// Checkout was attempted with no items.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart line whose `total != price × quantity` reached the
    /// coordinator. Snapshots are built through [`SaleItem::snapshot`],
    /// so this indicates a corrupted or hand-rolled line.
    ///
    /// [`SaleItem::snapshot`]: crate::types::SaleItem::snapshot
    #[error("Line total does not match price × quantity for product {product_id}")]
    InconsistentLine { product_id: String },

    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: String, max: String },

    /// The order lifecycle is linear and forward-only.
    #[error("Order cannot move from {from:?} to {to:?}")]
    InvalidOrderTransition { from: OrderStatus, to: OrderStatus },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation failures, raised before any business logic runs.
/// Fully recoverable: no state has changed; the caller re-prompts.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (bad UUID, bad scan code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A non-cash order was submitted without a payment proof.
    #[error("Payment proof attachment is required for this payment method")]
    PaymentProofRequired,

    /// A cash order declared less tendered cash than its total.
    #[error("Tendered amount {tendered} is less than order total {total}")]
    InsufficientTender { tendered: String, total: String },

    /// The typed confirmation did not match the customer's exact name.
    /// Deliberate friction before a destructive operation, not a
    /// cryptographic guarantee.
    #[error("Confirmation text does not match the customer name")]
    ConfirmationMismatch,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidOrderTransition {
            from: OrderStatus::Finished,
            to: OrderStatus::Pending,
        };
        assert_eq!(err.to_string(), "Order cannot move from Finished to Pending");

        let err = CoreError::CustomerRequired;
        assert_eq!(err.to_string(), "Credit sale requires a customer");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
