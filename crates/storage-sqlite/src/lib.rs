//! SQLite storage for the costfolio engine.
//!
//! This crate is the only place Diesel appears. It implements the repository
//! traits defined in `costfolio-core` and contains:
//! - connection pooling and the single-writer actor
//! - embedded Diesel migrations
//! - database row types and their conversions to domain types
//!
//! ```text
//!     core (domain, services)
//!                │
//!                ▼
//!     storage-sqlite (this crate)
//!                │
//!                ▼
//!            SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod holdings;
pub mod portfolios;
pub mod transactions;

pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

pub use errors::{IntoCore, StorageError};

pub use holdings::HoldingRepository;
pub use portfolios::PortfolioRepository;
pub use transactions::TransactionRepository;

pub use costfolio_core::errors::{DatabaseError, Error, Result};
