//! Portfolios module - ownership scope for holdings.

mod portfolios_model;
mod portfolios_traits;

pub use portfolios_model::{NewPortfolio, Portfolio};
pub use portfolios_traits::{get_owned_portfolio, PortfolioRepositoryTrait};
