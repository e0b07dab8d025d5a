use super::transactions_model::*;
use crate::holdings::Holding;
use crate::Result;
use async_trait::async_trait;

/// Read access to transaction histories.
///
/// Writes go through [`crate::holdings::HoldingRepositoryTrait`], which owns
/// the atomic commit of a holding together with its transactions.
pub trait TransactionRepositoryTrait: Send + Sync {
    /// Fails with `Error::NotFound` if the transaction does not exist.
    fn get_transaction(&self, transaction_id: &str) -> Result<Transaction>;

    /// All transactions of a holding, oldest first
    /// (`transaction_date`, then `created_at`, then `id`).
    fn list_transactions(&self, holding_id: &str) -> Result<Vec<Transaction>>;

    /// Transactions across a portfolio's holdings, newest first.
    fn list_by_portfolio(
        &self,
        portfolio_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>>;

    fn count_by_holding(&self, holding_id: &str) -> Result<usize>;
}

/// Trait defining the contract for transaction service operations.
///
/// Every call is scoped to `owner_id`; entities outside that scope behave as
/// if they did not exist.
#[async_trait]
pub trait TransactionServiceTrait: Send + Sync {
    fn get_transaction(&self, owner_id: &str, transaction_id: &str) -> Result<Transaction>;

    fn list_portfolio_transactions(
        &self,
        owner_id: &str,
        portfolio_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>>;

    fn get_holding(&self, owner_id: &str, holding_id: &str) -> Result<Holding>;

    fn list_holdings(&self, owner_id: &str, portfolio_id: &str) -> Result<Vec<Holding>>;

    async fn create_transaction(
        &self,
        owner_id: &str,
        portfolio_id: &str,
        new_transaction: NewTransaction,
    ) -> Result<Transaction>;

    async fn update_transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
        update: TransactionUpdate,
    ) -> Result<Transaction>;

    async fn delete_transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
    ) -> Result<TransactionDeletion>;
}
