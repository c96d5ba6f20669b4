//! # Repository Modules
//!
//! One repository per aggregate. Every method here is a single-aggregate
//! operation: one row, or one header plus its lines. Cross-aggregate
//! sequencing (the sale commit) lives in balcao-engine, which calls
//! these repositories in order and records its progress through the
//! intent repository.

pub mod customer;
pub mod intent;
pub mod order;
pub mod product;
pub mod sale;
