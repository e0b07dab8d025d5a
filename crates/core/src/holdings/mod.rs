//! Holdings module - the per-symbol position inside a portfolio.

mod holdings_model;
mod holdings_traits;

pub use holdings_model::{normalize_symbol, Holding, NewHolding};
pub use holdings_traits::{get_owned_holding, HoldingRepositoryTrait};
