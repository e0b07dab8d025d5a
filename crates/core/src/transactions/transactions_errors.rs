//! Errors specific to transaction operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Symbol is required to record a transaction")]
    MissingSymbol,

    #[error("Update for transaction {0} contains no changes")]
    EmptyUpdate(String),
}
