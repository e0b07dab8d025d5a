//! SQLite storage for holdings and their atomic commits.

mod model;
mod repository;

pub use model::HoldingDB;
pub use repository::HoldingRepository;
