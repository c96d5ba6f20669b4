//! # balcao-db: Database Layer for Balcão POS
//!
//! This crate provides database access for the Balcão POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Balcão POS Data Flow                        │
//! │                                                                 │
//! │  balcao-engine (coordinator / intake / read model)              │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                  balcao-db (THIS CRATE)                   │  │
//! │  │                                                           │  │
//! │  │  ┌─────────────┐   ┌────────────────┐   ┌─────────────┐  │  │
//! │  │  │  Database   │   │  Repositories  │   │ Migrations  │  │  │
//! │  │  │  (pool.rs)  │   │ product.rs     │   │ (embedded)  │  │  │
//! │  │  │             │   │ customer.rs    │   │             │  │  │
//! │  │  │ SqlitePool  │◄──│ sale.rs        │   │ 001_init    │  │  │
//! │  │  │ WAL mode    │   │ order.rs       │   │   .sql      │  │  │
//! │  │  │             │   │ intent.rs      │   │             │  │  │
//! │  │  └─────────────┘   └────────────────┘   └─────────────┘  │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │       │                                                         │
//! │       ▼                                                         │
//! │  SQLite file (balcao.db) — one per store                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## No Cross-Aggregate Transactions
//! Repositories never open transactions spanning aggregates. Each
//! method writes one aggregate; the commit sequence across aggregates
//! is owned by balcao-engine's coordinator, which uses the intent
//! repository as its write-ahead record.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations per aggregate

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::intent::IntentRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
