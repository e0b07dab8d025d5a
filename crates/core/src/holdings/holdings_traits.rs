//! Holding repository trait.

use async_trait::async_trait;

use super::holdings_model::{Holding, NewHolding};
use crate::errors::{Error, NotFoundError, Result};
use crate::portfolios::PortfolioRepositoryTrait;
use crate::transactions::Transaction;

/// Persistence contract for holdings.
///
/// Holdings own their transactions: every write that changes a history goes
/// through this trait so the holding and its transactions commit together.
#[async_trait]
pub trait HoldingRepositoryTrait: Send + Sync {
    /// Fails with `Error::NotFound` if the holding does not exist.
    fn get_holding(&self, holding_id: &str) -> Result<Holding>;

    /// Looks a holding up by its (normalized) symbol within a portfolio.
    fn find_by_symbol(&self, portfolio_id: &str, symbol: &str) -> Result<Option<Holding>>;

    fn list_by_portfolio(&self, portfolio_id: &str) -> Result<Vec<Holding>>;

    fn list_by_portfolios(&self, portfolio_ids: &[String]) -> Result<Vec<Holding>>;

    /// Inserts a new holding. A second holding for the same portfolio and
    /// symbol fails with `DatabaseError::UniqueViolation`.
    async fn create_holding(&self, new_holding: NewHolding) -> Result<Holding>;

    /// Atomically updates the holding and upserts the given transactions.
    ///
    /// Transactions not listed are left untouched.
    async fn save(&self, holding: &Holding, transactions: &[Transaction]) -> Result<Holding>;

    /// Atomically deletes one transaction and saves the holding together
    /// with the re-annotated transactions in `touched`.
    async fn remove_transaction(
        &self,
        holding: &Holding,
        transaction_id: &str,
        touched: &[Transaction],
    ) -> Result<Holding>;

    /// Deletes the holding together with its transactions.
    async fn delete_holding(&self, holding_id: &str) -> Result<usize>;
}

/// Loads a holding and checks it belongs to a portfolio of `owner_id`.
///
/// Holdings of other owners are reported as not found.
pub fn get_owned_holding(
    holdings: &dyn HoldingRepositoryTrait,
    portfolios: &dyn PortfolioRepositoryTrait,
    owner_id: &str,
    holding_id: &str,
) -> Result<Holding> {
    let holding = holdings.get_holding(holding_id)?;
    match portfolios.get_portfolio(&holding.portfolio_id) {
        Ok(portfolio) if portfolio.owner_id == owner_id => Ok(holding),
        Ok(_) | Err(Error::NotFound(_)) => Err(NotFoundError::holding(holding_id).into()),
        Err(e) => Err(e),
    }
}
