//! Costfolio Core - domain entities, the recompute engine, services, and traits.
//!
//! This crate holds the business logic for deriving holding quantities and
//! cost bases from transaction histories. It is database-agnostic and defines
//! traits that are implemented by the `storage-sqlite` crate.

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod holdings;
pub mod portfolios;
pub mod recompute;
pub mod transactions;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export error types
pub use errors::Error;
pub use errors::Result;

pub use config::{CostBasisPolicy, EngineConfig, ValidationPolicy};
