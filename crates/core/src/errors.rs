//! Core error types for the costfolio engine.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::transactions::TransactionError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Name used at the orchestrator boundary for the root error type.
pub type EngineError = Error;

/// Root error type for the engine.
///
/// Validation and lookup failures are reported to the caller as-is and are
/// never retried. Everything else (persistence, unexpected states) is an
/// engine failure that callers surface as a server-side error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// True for errors caused by the caller's input or scope rather than the engine.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::NotFound(_) | Error::Transaction(_)
        )
    }
}

/// Business-rule violations on a single transaction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Transaction quantity must be positive (got {0})")]
    NonPositiveQuantity(Decimal),

    #[error("Price per share must be positive (got {0})")]
    NonPositivePrice(Decimal),

    #[error("Exchange rate must be positive (got {0})")]
    NonPositiveExchangeRate(Decimal),

    #[error("Fees cannot be negative (got {0})")]
    NegativeFees(Decimal),

    #[error("Currency must be a 3-letter code (got '{0}')")]
    InvalidCurrency(String),

    #[error("Transaction date cannot be in the future ({0})")]
    FutureDate(DateTime<Utc>),

    #[error("Total amount {provided} doesn't match calculated value {expected}")]
    TotalAmountMismatch { provided: Decimal, expected: Decimal },

    #[error("{0} is outside the supported decimal range")]
    AmountOutOfRange(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(String),
}

/// A referenced entity does not exist or is outside the caller's scope.
///
/// Both cases produce the same error so that callers cannot probe for
/// entities owned by someone else.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{resource} not found: {identifier}")]
pub struct NotFoundError {
    pub resource: Resource,
    pub identifier: String,
}

impl NotFoundError {
    pub fn new(resource: Resource, identifier: impl Into<String>) -> Self {
        Self {
            resource,
            identifier: identifier.into(),
        }
    }

    pub fn holding(identifier: impl Into<String>) -> Self {
        Self::new(Resource::Holding, identifier)
    }

    pub fn portfolio(identifier: impl Into<String>) -> Self {
        Self::new(Resource::Portfolio, identifier)
    }

    pub fn transaction(identifier: impl Into<String>) -> Self {
        Self::new(Resource::Transaction, identifier)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Holding,
    Portfolio,
    Transaction,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Resource::Holding => "Holding",
            Resource::Portfolio => "Portfolio",
            Resource::Transaction => "Transaction",
        };
        f.write_str(name)
    }
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err.to_string()))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Unexpected(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
