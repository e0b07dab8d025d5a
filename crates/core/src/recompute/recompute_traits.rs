use async_trait::async_trait;

use super::recompute_model::{BatchRecomputeResult, HoldingRecomputeOutcome};
use crate::Result;

/// Re-derives holding aggregates and cost snapshots from stored histories.
///
/// Every operation is scoped to `owner_id`. Each holding is committed in its
/// own atomic write, so a batch can partially succeed.
#[async_trait]
pub trait RecomputeServiceTrait: Send + Sync {
    /// Fails with `Error::NotFound` if the holding does not exist or belongs
    /// to another owner.
    async fn recompute_holding(
        &self,
        owner_id: &str,
        holding_id: &str,
    ) -> Result<HoldingRecomputeOutcome>;

    /// Recomputes every holding of the portfolio. Per-holding failures are
    /// collected in the result; only a missing portfolio fails the call.
    async fn recompute_portfolio(
        &self,
        owner_id: &str,
        portfolio_id: &str,
    ) -> Result<BatchRecomputeResult>;

    /// Recomputes every holding in every portfolio of the owner.
    async fn recompute_all(&self, owner_id: &str) -> Result<BatchRecomputeResult>;
}
