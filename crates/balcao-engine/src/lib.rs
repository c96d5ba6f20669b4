//! # balcao-engine: Orchestration Layer for Balcão POS
//!
//! Everything that moves between the pure domain (balcao-core) and the
//! repositories (balcao-db): the multi-aggregate sale commit, the order
//! intake queue, the read-model cache, and the reconciliation pass.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 balcao-engine (THIS CRATE)                      │
//! │                                                                 │
//! │  ┌──────────────────┐  ┌─────────────┐  ┌──────────────────┐    │
//! │  │  Transaction     │  │   Order     │  │   ReadModel      │    │
//! │  │  Coordinator     │  │   Intake    │  │   Cache          │    │
//! │  │                  │  │             │  │                  │    │
//! │  │ complete_sale    │  │ submit      │  │ refresh          │    │
//! │  │ record_payment   │  │ claim       │  │ snapshot         │    │
//! │  │ staff ops        │  │ broadcast   │  │                  │    │
//! │  └──────────────────┘  └─────────────┘  └──────────────────┘    │
//! │            │                                                    │
//! │  ┌──────────────────┐                                           │
//! │  │   Reconciler     │  startup repair pass over interrupted     │
//! │  │   reconcile      │  commits (pending intents)                │
//! │  └──────────────────┘                                           │
//! └───────────────┬─────────────────────────────────────────────────┘
//!                 │
//!        balcao-db repositories (one aggregate each)
//! ```
//!
//! ## Wiring
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("./balcao.db")).await?;
//!
//! // Repair interrupted commits before accepting new ones
//! Reconciler::new(db.clone()).reconcile().await?;
//!
//! let cache = ReadModelCache::new(db.clone());
//! cache.refresh().await?;
//!
//! let coordinator = TransactionCoordinator::new(db.clone(), cache.clone());
//! let intake = OrderIntake::new(db.clone());
//! ```

pub mod coordinator;
pub mod error;
pub mod intake;
pub mod read_model;
pub mod reconcile;

pub use coordinator::{CheckoutRequest, ProductDraft, TransactionCoordinator};
pub use error::{CommitStage, EngineError, EngineResult};
pub use intake::{ClaimedOrder, OrderEvent, OrderIntake, OrderRequest, StaleStockWarning};
pub use read_model::{ReadModelCache, Snapshot};
pub use reconcile::{CommitRepair, Reconciler, RepairAction};
