//! SQLite storage for transactions.

mod model;
mod repository;

pub use model::TransactionDB;
pub use repository::TransactionRepository;
