//! In-memory repositories and builders shared by the service tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::errors::{DatabaseError, Error, NotFoundError, Result};
use crate::holdings::{Holding, HoldingRepositoryTrait, NewHolding};
use crate::portfolios::{NewPortfolio, Portfolio, PortfolioRepositoryTrait};
use crate::transactions::{Transaction, TransactionRepositoryTrait, TransactionType};

pub fn base_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
}

/// A transaction dated `day` days after [`base_date`], no fees, rate 1.
pub fn transaction_on(
    id: &str,
    transaction_type: TransactionType,
    quantity: Decimal,
    price_per_share: Decimal,
    day: i64,
) -> Transaction {
    Transaction {
        id: id.to_string(),
        holding_id: "holding-1".to_string(),
        transaction_type,
        quantity,
        price_per_share,
        total_amount: None,
        fees: Decimal::ZERO,
        currency: "USD".to_string(),
        exchange_rate: Decimal::ONE,
        transaction_date: base_date() + Duration::days(day),
        average_cost_per_share_at_transaction: None,
        notes: None,
        created_at: base_date(),
        updated_at: base_date(),
    }
}

#[derive(Default)]
struct StoreState {
    portfolios: HashMap<String, Portfolio>,
    holdings: HashMap<String, Holding>,
    transactions: HashMap<String, Transaction>,
}

/// One store implementing every repository trait, with failure injection.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    failing_holdings: Mutex<HashSet<String>>,
    saves: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_portfolio(&self, id: &str, owner_id: &str) -> Portfolio {
        let portfolio = Portfolio {
            id: id.to_string(),
            owner_id: owner_id.to_string(),
            name: format!("Portfolio {}", id),
            currency: "USD".to_string(),
            created_at: base_date(),
            updated_at: base_date(),
        };
        self.state
            .lock()
            .unwrap()
            .portfolios
            .insert(portfolio.id.clone(), portfolio.clone());
        portfolio
    }

    pub fn add_holding(&self, id: &str, portfolio_id: &str, symbol: &str) -> Holding {
        let mut new_holding = NewHolding::for_symbol(portfolio_id, symbol, None);
        new_holding.id = Some(id.to_string());
        let holding = new_holding.into_holding(base_date());
        self.state
            .lock()
            .unwrap()
            .holdings
            .insert(holding.id.clone(), holding.clone());
        holding
    }

    /// Stores `transaction` under `holding_id` without recomputing anything.
    pub fn add_transaction(&self, holding_id: &str, mut transaction: Transaction) -> Transaction {
        transaction.holding_id = holding_id.to_string();
        self.state
            .lock()
            .unwrap()
            .transactions
            .insert(transaction.id.clone(), transaction.clone());
        transaction
    }

    /// Overwrites stored aggregates, simulating drift.
    pub fn set_aggregates(&self, holding_id: &str, quantity: Decimal, average_cost: Decimal) {
        let mut state = self.state.lock().unwrap();
        let holding = state.holdings.get_mut(holding_id).unwrap();
        holding.current_quantity = quantity;
        holding.average_cost_per_share = average_cost;
    }

    /// Makes every read and write of `holding_id` fail with a database error.
    pub fn fail_holding(&self, holding_id: &str) {
        self.failing_holdings
            .lock()
            .unwrap()
            .insert(holding_id.to_string());
    }

    pub fn holding(&self, holding_id: &str) -> Option<Holding> {
        self.state.lock().unwrap().holdings.get(holding_id).cloned()
    }

    pub fn transaction(&self, transaction_id: &str) -> Option<Transaction> {
        self.state
            .lock()
            .unwrap()
            .transactions
            .get(transaction_id)
            .cloned()
    }

    pub fn transaction_count(&self, holding_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .transactions
            .values()
            .filter(|t| t.holding_id == holding_id)
            .count()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn check_failure(&self, holding_id: &str) -> Result<()> {
        if self.failing_holdings.lock().unwrap().contains(holding_id) {
            return Err(DatabaseError::QueryFailed(format!(
                "injected failure for holding {}",
                holding_id
            ))
            .into());
        }
        Ok(())
    }

    fn write_holding(&self, holding: &Holding, transactions: &[Transaction]) -> Result<Holding> {
        let mut state = self.state.lock().unwrap();
        if !state.holdings.contains_key(&holding.id) {
            return Err(NotFoundError::holding(&holding.id).into());
        }
        state.holdings.insert(holding.id.clone(), holding.clone());
        for transaction in transactions {
            state
                .transactions
                .insert(transaction.id.clone(), transaction.clone());
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(holding.clone())
    }
}

#[async_trait]
impl HoldingRepositoryTrait for InMemoryStore {
    fn get_holding(&self, holding_id: &str) -> Result<Holding> {
        self.check_failure(holding_id)?;
        self.holding(holding_id)
            .ok_or_else(|| NotFoundError::holding(holding_id).into())
    }

    fn find_by_symbol(&self, portfolio_id: &str, symbol: &str) -> Result<Option<Holding>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .holdings
            .values()
            .find(|h| h.portfolio_id == portfolio_id && h.symbol == symbol)
            .cloned())
    }

    fn list_by_portfolio(&self, portfolio_id: &str) -> Result<Vec<Holding>> {
        self.list_by_portfolios(&[portfolio_id.to_string()])
    }

    fn list_by_portfolios(&self, portfolio_ids: &[String]) -> Result<Vec<Holding>> {
        let mut holdings: Vec<Holding> = self
            .state
            .lock()
            .unwrap()
            .holdings
            .values()
            .filter(|h| portfolio_ids.contains(&h.portfolio_id))
            .cloned()
            .collect();
        holdings.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(holdings)
    }

    async fn create_holding(&self, new_holding: NewHolding) -> Result<Holding> {
        let mut state = self.state.lock().unwrap();
        let duplicate = state.holdings.values().any(|h| {
            h.portfolio_id == new_holding.portfolio_id && h.symbol == new_holding.symbol
        });
        if duplicate {
            return Err(DatabaseError::UniqueViolation(format!(
                "holding {} already exists",
                new_holding.symbol
            ))
            .into());
        }
        let holding = new_holding.into_holding(Utc::now());
        state.holdings.insert(holding.id.clone(), holding.clone());
        Ok(holding)
    }

    async fn save(&self, holding: &Holding, transactions: &[Transaction]) -> Result<Holding> {
        self.check_failure(&holding.id)?;
        self.write_holding(holding, transactions)
    }

    async fn remove_transaction(
        &self,
        holding: &Holding,
        transaction_id: &str,
        touched: &[Transaction],
    ) -> Result<Holding> {
        self.check_failure(&holding.id)?;
        self.state
            .lock()
            .unwrap()
            .transactions
            .remove(transaction_id)
            .ok_or_else(|| Error::from(NotFoundError::transaction(transaction_id)))?;
        self.write_holding(holding, touched)
    }

    async fn delete_holding(&self, holding_id: &str) -> Result<usize> {
        self.check_failure(holding_id)?;
        let mut state = self.state.lock().unwrap();
        state.transactions.retain(|_, t| t.holding_id != holding_id);
        Ok(state.holdings.remove(holding_id).map_or(0, |_| 1))
    }
}

impl TransactionRepositoryTrait for InMemoryStore {
    fn get_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        self.transaction(transaction_id)
            .ok_or_else(|| NotFoundError::transaction(transaction_id).into())
    }

    fn list_transactions(&self, holding_id: &str) -> Result<Vec<Transaction>> {
        self.check_failure(holding_id)?;
        let mut transactions: Vec<Transaction> = self
            .state
            .lock()
            .unwrap()
            .transactions
            .values()
            .filter(|t| t.holding_id == holding_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));
        Ok(transactions)
    }

    fn list_by_portfolio(
        &self,
        portfolio_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let state = self.state.lock().unwrap();
        let mut transactions: Vec<Transaction> = state
            .transactions
            .values()
            .filter(|t| {
                state
                    .holdings
                    .get(&t.holding_id)
                    .is_some_and(|h| h.portfolio_id == portfolio_id)
            })
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.ordering_key().cmp(&a.ordering_key()));
        Ok(transactions
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    fn count_by_holding(&self, holding_id: &str) -> Result<usize> {
        Ok(self.transaction_count(holding_id))
    }
}

#[async_trait]
impl PortfolioRepositoryTrait for InMemoryStore {
    fn get_portfolio(&self, portfolio_id: &str) -> Result<Portfolio> {
        self.state
            .lock()
            .unwrap()
            .portfolios
            .get(portfolio_id)
            .cloned()
            .ok_or_else(|| NotFoundError::portfolio(portfolio_id).into())
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Portfolio>> {
        let mut portfolios: Vec<Portfolio> = self
            .state
            .lock()
            .unwrap()
            .portfolios
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        portfolios.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(portfolios)
    }

    async fn create_portfolio(&self, new_portfolio: NewPortfolio) -> Result<Portfolio> {
        new_portfolio.validate()?;
        let portfolio = new_portfolio.into_portfolio(Utc::now());
        self.state
            .lock()
            .unwrap()
            .portfolios
            .insert(portfolio.id.clone(), portfolio.clone());
        Ok(portfolio)
    }
}
