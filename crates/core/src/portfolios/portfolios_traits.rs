//! Portfolio repository trait.

use async_trait::async_trait;

use super::portfolios_model::{NewPortfolio, Portfolio};
use crate::errors::{NotFoundError, Result};

#[async_trait]
pub trait PortfolioRepositoryTrait: Send + Sync {
    /// Fails with `Error::NotFound` if the portfolio does not exist.
    fn get_portfolio(&self, portfolio_id: &str) -> Result<Portfolio>;

    /// Portfolios of one owner, oldest first.
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Portfolio>>;

    async fn create_portfolio(&self, new_portfolio: NewPortfolio) -> Result<Portfolio>;
}

/// Loads a portfolio and checks it belongs to `owner_id`.
///
/// Portfolios of other owners are reported as not found.
pub fn get_owned_portfolio(
    portfolios: &dyn PortfolioRepositoryTrait,
    owner_id: &str,
    portfolio_id: &str,
) -> Result<Portfolio> {
    let portfolio = portfolios.get_portfolio(portfolio_id)?;
    if portfolio.owner_id != owner_id {
        return Err(NotFoundError::portfolio(portfolio_id).into());
    }
    Ok(portfolio)
}
