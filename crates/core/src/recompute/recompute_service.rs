use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};

use super::cost_basis_calculator::calculate_cost_basis;
use super::holding_locks::HoldingLocks;
use super::recompute_model::{
    BatchRecomputeResult, HoldingRecomputeFailure, HoldingRecomputeOutcome, IntegrityAnomaly,
};
use super::recompute_traits::RecomputeServiceTrait;
use super::transaction_annotator::annotate_transactions;
use crate::config::{CostBasisPolicy, EngineConfig};
use crate::events::{DomainEvent, DomainEventSink};
use crate::holdings::{get_owned_holding, Holding, HoldingRepositoryTrait};
use crate::portfolios::{get_owned_portfolio, PortfolioRepositoryTrait};
use crate::transactions::{Transaction, TransactionRepositoryTrait};
use crate::Result;

/// Outcome of running the calculator and annotator over one history.
#[derive(Debug, Clone)]
pub(crate) struct Derivation {
    pub anomaly: Option<IntegrityAnomaly>,
    /// Ids of transactions whose snapshot was rewritten.
    pub annotated: HashSet<String>,
}

impl Derivation {
    /// Transactions that need to be written back: every re-annotated one plus
    /// any id in `also`.
    pub fn touched(&self, transactions: &[Transaction], also: &[&str]) -> Vec<Transaction> {
        transactions
            .iter()
            .filter(|t| self.annotated.contains(&t.id) || also.contains(&t.id.as_str()))
            .cloned()
            .collect()
    }
}

/// Re-derives `holding`'s aggregates from `transactions` and re-annotates them.
///
/// `transactions` ends up in chronological order. Economic fields are never
/// modified. `holding` is left untouched when the history cannot be derived.
pub(crate) fn derive_holding(
    holding: &mut Holding,
    transactions: &mut [Transaction],
    policy: CostBasisPolicy,
) -> Result<Derivation> {
    let calculation = calculate_cost_basis(transactions, policy)?;
    let annotated = annotate_transactions(transactions, policy)?
        .into_iter()
        .collect();

    holding.current_quantity = calculation.quantity;
    holding.average_cost_per_share = calculation.average_cost_per_share;

    Ok(Derivation {
        anomaly: IntegrityAnomaly::from_calculation(holding, &calculation),
        annotated,
    })
}

/// Emits `HoldingRecomputed` and, for oversold histories, logs and emits the anomaly.
pub(crate) fn publish_recompute_events(
    event_sink: &dyn DomainEventSink,
    holding: &Holding,
    anomaly: Option<&IntegrityAnomaly>,
) {
    let mut events = vec![DomainEvent::holding_recomputed(
        holding.portfolio_id.as_str(),
        holding.id.as_str(),
    )];
    if let Some(anomaly) = anomaly {
        warn!("Integrity anomaly: {}", anomaly);
        events.push(DomainEvent::integrity_anomaly_detected(
            anomaly.holding_id.as_str(),
            anomaly.symbol.as_str(),
            anomaly.computed_quantity,
        ));
    }
    event_sink.emit_batch(events);
}

/// Orchestrates holding recomputation at holding, portfolio and owner scope.
pub struct RecomputeService {
    holding_repository: Arc<dyn HoldingRepositoryTrait>,
    transaction_repository: Arc<dyn TransactionRepositoryTrait>,
    portfolio_repository: Arc<dyn PortfolioRepositoryTrait>,
    locks: HoldingLocks,
    config: EngineConfig,
    event_sink: Arc<dyn DomainEventSink>,
}

impl RecomputeService {
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
            locks,
            config,
            event_sink,
        }
    }

    /// Read-modify-write of one holding under its lock.
    ///
    /// The holding is re-read after the lock is taken so a concurrent write
    /// that finished first is never overwritten with stale aggregates.
    async fn recompute_locked(&self, holding_id: &str) -> Result<HoldingRecomputeOutcome> {
        let _guard = self.locks.acquire(holding_id).await;

        let mut holding = self.holding_repository.get_holding(holding_id)?;
        let mut transactions = self.transaction_repository.list_transactions(holding_id)?;

        let derivation = derive_holding(
            &mut holding,
            &mut transactions,
            self.config.cost_basis_policy,
        )?;
        holding.updated_at = Utc::now();

        let touched = derivation.touched(&transactions, &[]);
        let saved = self.holding_repository.save(&holding, &touched).await?;

        debug!(
            "Recomputed holding {} ({}): quantity {}, average cost {}, {} snapshot(s) rewritten",
            saved.id,
            saved.symbol,
            saved.current_quantity,
            saved.average_cost_per_share,
            touched.len()
        );
        publish_recompute_events(self.event_sink.as_ref(), &saved, derivation.anomaly.as_ref());

        Ok(HoldingRecomputeOutcome {
            holding: saved,
            transactions_annotated: touched.len(),
            anomaly: derivation.anomaly,
        })
    }

    /// Recomputes `holdings` on a bounded worker pool, collecting failures per holding.
    async fn recompute_batch(&self, holdings: Vec<Holding>) -> BatchRecomputeResult {
        let concurrency = self.config.recompute_concurrency.max(1);

        let results: Vec<(Holding, Result<HoldingRecomputeOutcome>)> =
            stream::iter(holdings.into_iter().map(|holding| async move {
                let result = self.recompute_locked(&holding.id).await;
                (holding, result)
            }))
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut batch = BatchRecomputeResult::default();
        for (holding, result) in results {
            match result {
                Ok(outcome) => batch.recomputed.push(outcome),
                Err(e) => {
                    error!(
                        "Failed to recompute holding {} ({}): {}",
                        holding.id, holding.symbol, e
                    );
                    batch.failures.push(HoldingRecomputeFailure {
                        holding_id: holding.id,
                        symbol: holding.symbol,
                        error: e.to_string(),
                    });
                }
            }
        }

        batch.recomputed.sort_by(|a, b| {
            (&a.holding.portfolio_id, &a.holding.symbol, &a.holding.id).cmp(&(
                &b.holding.portfolio_id,
                &b.holding.symbol,
                &b.holding.id,
            ))
        });
        batch
            .failures
            .sort_by(|a, b| (&a.symbol, &a.holding_id).cmp(&(&b.symbol, &b.holding_id)));
        batch
    }
}

#[async_trait]
impl RecomputeServiceTrait for RecomputeService {
    async fn recompute_holding(
        &self,
        owner_id: &str,
        holding_id: &str,
    ) -> Result<HoldingRecomputeOutcome> {
        get_owned_holding(
            self.holding_repository.as_ref(),
            self.portfolio_repository.as_ref(),
            owner_id,
            holding_id,
        )?;
        self.recompute_locked(holding_id).await
    }

    async fn recompute_portfolio(
        &self,
        owner_id: &str,
        portfolio_id: &str,
    ) -> Result<BatchRecomputeResult> {
        let portfolio =
            get_owned_portfolio(self.portfolio_repository.as_ref(), owner_id, portfolio_id)?;
        let holdings = self.holding_repository.list_by_portfolio(&portfolio.id)?;
        let holding_count = holdings.len();

        let result = self.recompute_batch(holdings).await;
        info!(
            "Recomputed portfolio {}: {}/{} holding(s) succeeded, {} with integrity anomalies",
            portfolio.id,
            result.recomputed_count(),
            holding_count,
            result.anomalies().len()
        );
        Ok(result)
    }

    async fn recompute_all(&self, owner_id: &str) -> Result<BatchRecomputeResult> {
        let portfolio_ids: Vec<String> = self
            .portfolio_repository
            .list_by_owner(owner_id)?
            .into_iter()
            .map(|p| p.id)
            .collect();
        if portfolio_ids.is_empty() {
            info!("Owner {} has no portfolios; nothing to recompute", owner_id);
            return Ok(BatchRecomputeResult::default());
        }

        let holdings = self.holding_repository.list_by_portfolios(&portfolio_ids)?;
        let holding_count = holdings.len();

        let result = self.recompute_batch(holdings).await;
        info!(
            "Recomputed {}/{} holding(s) across {} portfolio(s) for owner {}",
            result.recomputed_count(),
            holding_count,
            portfolio_ids.len(),
            owner_id
        );
        if result.has_failures() {
            warn!(
                "{} holding(s) failed to recompute for owner {}",
                result.failures.len(),
                owner_id
            );
        }
        Ok(result)
    }
}
