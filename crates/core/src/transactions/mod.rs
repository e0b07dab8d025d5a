//! Transactions module - domain models, validation, services, and traits.

mod transactions_constants;
mod transactions_errors;
mod transactions_model;
mod transactions_service;
mod transactions_traits;
mod transactions_validator;

#[cfg(test)]
mod transactions_service_tests;

pub use transactions_constants::*;
pub use transactions_errors::TransactionError;
pub use transactions_model::{
    NewTransaction, Transaction, TransactionDeletion, TransactionType, TransactionUpdate,
};
pub use transactions_service::TransactionService;
pub use transactions_traits::{TransactionRepositoryTrait, TransactionServiceTrait};
pub use transactions_validator::TransactionValidator;
