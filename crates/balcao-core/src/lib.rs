//! # balcao-core: Pure Business Logic for Balcão POS
//!
//! This crate is the heart of the system: domain types and business rules
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     balcao-engine                               │
//! │   Transaction coordinator, order intake, read-model cache      │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────▼──────────────────────────────────┐
//! │                ★ balcao-core (THIS CRATE) ★                     │
//! │                                                                 │
//! │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌──────┐ ┌────────────┐ │
//! │   │  types  │ │  money  │ │ quantity │ │ cart │ │ validation │ │
//! │   └─────────┘ └─────────┘ └──────────┘ └──────┘ └────────────┘ │
//! │                                                                 │
//! │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────▼──────────────────────────────────┐
//! │                      balcao-db (SQLite)                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, Customer, Order, ...)
//! - [`money`] - Integer money in centavos (no floating point!)
//! - [`quantity`] - Integer quantities in milli-units (weighted goods)
//! - [`cart`] - In-memory, not-yet-committed cart of sale-item candidates
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input, same output
//! 2. **No I/O**: database, network, file system access is forbidden here
//! 3. **Integer arithmetic**: money in centavos (i64), quantities in
//!    milli-units (i64); floats never touch a stored value
//! 4. **Explicit errors**: typed errors, never strings or panics

pub mod cart;
pub mod error;
pub mod money;
pub mod quantity;
pub mod types;
pub mod validation;

pub use cart::{Cart, CartLine};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use quantity::Quantity;
pub use types::*;

/// Maximum distinct lines allowed in a single cart.
///
/// Prevents runaway carts and keeps transactions human-sized.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single cart line, in milli-units (999 units).
///
/// Guards against fat-finger quantities (typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: Quantity = Quantity::from_milli(999_000);
