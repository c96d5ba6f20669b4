//! # Engine Error Types
//!
//! The engine's error taxonomy separates two very different situations:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ValidationError / CoreError (via EngineError::Core)            │
//! │    Raised BEFORE any write. Nothing changed. The caller just    │
//! │    re-prompts the operator.                                     │
//! │                                                                 │
//! │  EngineError::Commit { stage }                                  │
//! │    Raised DURING the multi-aggregate commit sequence. State may │
//! │    be partial: the stage names exactly how far the sequence     │
//! │    got, and the still-pending intent lets the reconciler        │
//! │    repair the remainder.                                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no automatic retry anywhere: errors surface synchronously
//! to the caller.

use thiserror::Error;

use balcao_core::{CoreError, ValidationError};
use balcao_db::DbError;

/// Stage of the sale commit sequence at which a failure occurred.
///
/// Stages are ordered: a failure at a given stage means every earlier
/// stage landed and nothing later was attempted (except stock
/// decrements, which are attempted per line).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStage {
    /// Opening the write-ahead intent. Nothing committed.
    Intent,
    /// Writing the sale header. Intent marked failed; nothing committed.
    SaleHeader,
    /// Writing sale line items. Header exists; intent stays pending.
    SaleItems,
    /// Applying per-line stock decrements. Some lines may have applied.
    StockDecrement,
    /// Writing the customer ledger entry for a credit sale.
    Ledger,
    /// Finishing the originating order after the sale landed.
    OrderFinish,
    /// Closing the intent after everything else landed.
    IntentClose,
}

/// Engine operation errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule or input validation failure. No state changed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The commit sequence stopped partway. `stage` names the write
    /// that failed; the intent record holds what was meant to happen.
    #[error("Commit failed at stage {stage:?}: {source}")]
    Commit { stage: CommitStage, source: DbError },

    /// A database failure outside the commit sequence (reads, intake,
    /// staff operations).
    #[error(transparent)]
    Db(#[from] DbError),
}

impl EngineError {
    /// Tags a database error with the commit stage it interrupted.
    pub fn commit(stage: CommitStage, source: DbError) -> Self {
        EngineError::Commit { stage, source }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
