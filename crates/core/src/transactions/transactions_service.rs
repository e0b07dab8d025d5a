use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use tokio::sync::OwnedMutexGuard;

use super::transactions_constants::DEFAULT_TRANSACTION_PAGE_SIZE;
use super::transactions_errors::TransactionError;
use super::transactions_model::{
    truncate_timestamp, NewTransaction, Transaction, TransactionDeletion, TransactionUpdate,
};
use super::transactions_traits::{TransactionRepositoryTrait, TransactionServiceTrait};
use super::transactions_validator::TransactionValidator;
use crate::config::EngineConfig;
use crate::errors::{DatabaseError, Error, NotFoundError, Result};
use crate::events::{DomainEvent, DomainEventSink};
use crate::holdings::{get_owned_holding, normalize_symbol, Holding, HoldingRepositoryTrait, NewHolding};
use crate::portfolios::{get_owned_portfolio, PortfolioRepositoryTrait};
use crate::recompute::{derive_holding, publish_recompute_events, HoldingLocks};

/// Service for recording and editing transactions.
///
/// Every mutation re-derives the owning holding under its lock and commits
/// the holding and the affected transactions in one write.
pub struct TransactionService {
    holding_repository: Arc<dyn HoldingRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    validator: TransactionValidator,
    locks: HoldingLocks,
    config: EngineConfig,
    event_sink: Arc<dyn DomainEventSink>,
}

impl TransactionService {
    pub fn new(
        holding_repository: Arc<dyn HoldingRepositoryTrait>,
        transaction_repository: Arc<dyn TransactionRepositoryTrait>,
        portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
        locks: HoldingLocks,
        config: EngineConfig,
        event_sink: Arc<dyn DomainEventSink>,
    ) -> Self {
        Self {
            holding_repository,
            transaction_repository,
            portfolio_repository,
            validator: TransactionValidator::new(config.validation.clone()),
            locks,
            config,
            event_sink,
        }
    }

    /// Loads a transaction together with its holding, checking ownership.
    ///
    /// A transaction in someone else's holding is reported as not found.
    fn get_owned_transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
    ) -> Result<(Transaction, Holding)> {
        let transaction = self.transaction_repository.get_transaction(transaction_id)?;
        let holding = get_owned_holding(
            self.holding_repository.as_ref(),
            self.portfolio_repository.as_ref(),
            owner_id,
            &transaction.holding_id,
        )
        .map_err(|e| match e {
            Error::NotFound(_) => NotFoundError::transaction(transaction_id).into(),
            other => other,
        })?;
        Ok((transaction, holding))
    }

    /// Returns the portfolio's holding for `symbol`, creating it on first use.
    async fn get_or_create_holding(
        &self,
        portfolio_id: &str,
        symbol: &str,
        name: Option<String>,
    ) -> Result<Holding> {
        let symbol = normalize_symbol(symbol);
        if let Some(holding) = self.holding_repository.find_by_symbol(portfolio_id, &symbol)? {
            return Ok(holding);
        }

        match self
            .holding_repository
            .create_holding(NewHolding::for_symbol(portfolio_id, &symbol, name))
            .await
        {
            Ok(holding) => {
                info!(
                    "Created holding {} for {} in portfolio {}",
                    holding.id, holding.symbol, portfolio_id
                );
                Ok(holding)
            }
            // Lost a race with a concurrent create for the same symbol.
            Err(Error::Database(DatabaseError::UniqueViolation(_))) => self
                .holding_repository
                .find_by_symbol(portfolio_id, &symbol)?
                .ok_or_else(|| {
                    Error::Unexpected(format!(
                        "Holding {} in portfolio {} vanished after a duplicate insert",
                        symbol, portfolio_id
                    ))
                }),
            Err(e) => Err(e),
        }
    }

    /// Resolves the holding for `symbol` and takes its lock.
    ///
    /// A concurrent delete may remove the holding as empty between the lookup
    /// and the lock. The lookup then runs once more and creates a new holding.
    async fn lock_holding_for_symbol(
        &self,
        portfolio_id: &str,
        symbol: &str,
        name: Option<String>,
    ) -> Result<(OwnedMutexGuard<()>, Holding)> {
        let mut retried = false;
        loop {
            let resolved = self
                .get_or_create_holding(portfolio_id, symbol, name.clone())
                .await?;
            let guard = self.locks.acquire(&resolved.id).await;
            match self.holding_repository.get_holding(&resolved.id) {
                Ok(holding) => return Ok((guard, holding)),
                Err(Error::NotFound(_)) if !retried => {
                    debug!(
                        "Holding {} was removed while waiting for its lock, resolving {} again",
                        resolved.id, resolved.symbol
                    );
                    retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn emit_transactions_changed(&self, holding: &Holding, transaction_ids: Vec<String>) {
        self.event_sink.emit(DomainEvent::transactions_changed(
            holding.portfolio_id.as_str(),
            holding.id.as_str(),
            transaction_ids,
        ));
    }
}

#[async_trait]
impl TransactionServiceTrait for TransactionService {
    fn get_transaction(&self, owner_id: &str, transaction_id: &str) -> Result<Transaction> {
        self.get_owned_transaction(owner_id, transaction_id)
            .map(|(transaction, _)| transaction)
    }

    fn list_portfolio_transactions(
        &self,
        owner_id: &str,
        portfolio_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        get_owned_portfolio(self.portfolio_repository.as_ref(), owner_id, portfolio_id)?;
        let limit = if limit > 0 {
            limit
        } else {
            DEFAULT_TRANSACTION_PAGE_SIZE
        };
        self.transaction_repository
            .list_by_portfolio(portfolio_id, limit, offset.max(0))
    }

    fn get_holding(&self, owner_id: &str, holding_id: &str) -> Result<Holding> {
        get_owned_holding(
            self.holding_repository.as_ref(),
            self.portfolio_repository.as_ref(),
            owner_id,
            holding_id,
        )
    }

    fn list_holdings(&self, owner_id: &str, portfolio_id: &str) -> Result<Vec<Holding>> {
        get_owned_portfolio(self.portfolio_repository.as_ref(), owner_id, portfolio_id)?;
        self.holding_repository.list_by_portfolio(portfolio_id)
    }

    async fn create_transaction(
        &self,
        owner_id: &str,
        portfolio_id: &str,
        new_transaction: NewTransaction,
    ) -> Result<Transaction> {
        get_owned_portfolio(self.portfolio_repository.as_ref(), owner_id, portfolio_id)?;
        if new_transaction.symbol.trim().is_empty() {
            return Err(TransactionError::MissingSymbol.into());
        }
        self.validator.validate_new(&new_transaction)?;

        let (guard, mut holding) = self
            .lock_holding_for_symbol(
                portfolio_id,
                &new_transaction.symbol,
                new_transaction.name.clone(),
            )
            .await?;
        let mut transactions = self.transaction_repository.list_transactions(&holding.id)?;

        let now = Utc::now();
        let created = new_transaction.into_transaction(&holding.id, now);
        let created_id = created.id.clone();
        transactions.push(created);

        let derivation = derive_holding(
            &mut holding,
            &mut transactions,
            self.config.cost_basis_policy,
        )?;
        holding.updated_at = now;
        let touched = derivation.touched(&transactions, &[created_id.as_str()]);
        let saved = self.holding_repository.save(&holding, &touched).await?;
        drop(guard);

        debug!(
            "Recorded transaction {} on holding {} ({})",
            created_id, saved.id, saved.symbol
        );
        self.emit_transactions_changed(&saved, vec![created_id.clone()]);
        publish_recompute_events(self.event_sink.as_ref(), &saved, derivation.anomaly.as_ref());

        transactions
            .into_iter()
            .find(|t| t.id == created_id)
            .ok_or_else(|| Error::Unexpected(format!("Transaction {} was not saved", created_id)))
    }

    async fn update_transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
        update: TransactionUpdate,
    ) -> Result<Transaction> {
        if update.is_empty() {
            return Err(TransactionError::EmptyUpdate(transaction_id.to_string()).into());
        }
        let (_, holding) = self.get_owned_transaction(owner_id, transaction_id)?;

        let guard = self.locks.acquire(&holding.id).await;
        let mut holding = self.holding_repository.get_holding(&holding.id)?;
        let mut transactions = self.transaction_repository.list_transactions(&holding.id)?;

        let now = truncate_timestamp(Utc::now());
        let target = transactions
            .iter_mut()
            .find(|t| t.id == transaction_id)
            .ok_or_else(|| Error::from(NotFoundError::transaction(transaction_id)))?;
        let changes_economics = update.changes_economics();
        update.apply_to(target);
        self.validator.validate_at(target, now)?;
        target.updated_at = now;

        let derivation = derive_holding(
            &mut holding,
            &mut transactions,
            self.config.cost_basis_policy,
        )?;
        holding.updated_at = now;
        let touched = derivation.touched(&transactions, &[transaction_id]);
        let saved = self.holding_repository.save(&holding, &touched).await?;
        drop(guard);

        debug!(
            "Updated transaction {} on holding {} (economic change: {})",
            transaction_id, saved.id, changes_economics
        );
        self.emit_transactions_changed(&saved, vec![transaction_id.to_string()]);
        publish_recompute_events(self.event_sink.as_ref(), &saved, derivation.anomaly.as_ref());

        transactions
            .into_iter()
            .find(|t| t.id == transaction_id)
            .ok_or_else(|| NotFoundError::transaction(transaction_id).into())
    }

    async fn delete_transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
    ) -> Result<TransactionDeletion> {
        let (_, holding) = self.get_owned_transaction(owner_id, transaction_id)?;

        let guard = self.locks.acquire(&holding.id).await;
        let mut holding = self.holding_repository.get_holding(&holding.id)?;
        let mut remaining = self.transaction_repository.list_transactions(&holding.id)?;

        let before = remaining.len();
        remaining.retain(|t| t.id != transaction_id);
        if remaining.len() == before {
            return Err(NotFoundError::transaction(transaction_id).into());
        }

        let derivation = derive_holding(
            &mut holding,
            &mut remaining,
            self.config.cost_basis_policy,
        )?;
        holding.updated_at = Utc::now();

        let holding_deleted = self.config.delete_empty_holdings
            && holding.is_eligible_for_cleanup(remaining.len());

        if holding_deleted {
            self.holding_repository.delete_holding(&holding.id).await?;
            drop(guard);
            self.locks.release_idle(&holding.id);

            info!(
                "Deleted empty holding {} ({}) after removing transaction {}",
                holding.id, holding.symbol, transaction_id
            );
            self.emit_transactions_changed(&holding, vec![transaction_id.to_string()]);
            self.event_sink.emit(DomainEvent::holding_deleted(
                holding.portfolio_id.as_str(),
                holding.id.as_str(),
            ));
        } else {
            let touched = derivation.touched(&remaining, &[]);
            let saved = self
                .holding_repository
                .remove_transaction(&holding, transaction_id, &touched)
                .await?;
            drop(guard);

            debug!(
                "Deleted transaction {} from holding {} ({} remaining)",
                transaction_id,
                saved.id,
                remaining.len()
            );
            self.emit_transactions_changed(&saved, vec![transaction_id.to_string()]);
            publish_recompute_events(
                self.event_sink.as_ref(),
                &saved,
                derivation.anomaly.as_ref(),
            );
        }

        Ok(TransactionDeletion {
            transaction_id: transaction_id.to_string(),
            holding_id: holding.id,
            holding_deleted,
        })
    }
}
