//! Engine configuration.
//!
//! Built once at process start and handed to the services that need it.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::{Error, Result};

/// Default bound on the number of holdings recomputed concurrently.
pub const DEFAULT_RECOMPUTE_CONCURRENCY: usize = 4;

/// Default tolerance for the strict total amount cross-check.
pub const DEFAULT_TOTAL_AMOUNT_TOLERANCE: Decimal = dec!(0.01);

/// How disposals (SELL / TRANSFER_OUT) interact with the average cost.
///
/// The two policies report different average costs (and therefore different
/// gains) for the same history once a holding has been partially sold, so the
/// choice is made explicitly per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostBasisPolicy {
    /// Average cost is the weighted average of all acquisitions. Disposals
    /// reduce quantity only.
    #[default]
    WeightedAverageOfBuys,
    /// Disposals remove their proportional share of the held cost basis.
    ProportionalReduction,
}

impl CostBasisPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostBasisPolicy::WeightedAverageOfBuys => "WEIGHTED_AVERAGE_OF_BUYS",
            CostBasisPolicy::ProportionalReduction => "PROPORTIONAL_REDUCTION",
        }
    }
}

impl FromStr for CostBasisPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "WEIGHTED_AVERAGE_OF_BUYS" | "WEIGHTED_AVERAGE" => {
                Ok(CostBasisPolicy::WeightedAverageOfBuys)
            }
            "PROPORTIONAL_REDUCTION" | "PROPORTIONAL" => Ok(CostBasisPolicy::ProportionalReduction),
            other => Err(Error::InvalidConfigValue(format!(
                "Unknown cost basis policy: {}",
                other
            ))),
        }
    }
}

/// Strictness knobs for the transaction validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationPolicy {
    /// Require `total_amount == quantity * price_per_share + fees`.
    pub strict_total_amount: bool,
    /// Allowed absolute difference for the total amount check.
    pub total_amount_tolerance: Decimal,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            strict_total_amount: false,
            total_amount_tolerance: DEFAULT_TOTAL_AMOUNT_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub cost_basis_policy: CostBasisPolicy,
    pub validation: ValidationPolicy,
    /// Upper bound on holdings recomputed in parallel by batch operations.
    pub recompute_concurrency: usize,
    /// Delete a holding once its last transaction is removed and nothing is held.
    pub delete_empty_holdings: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cost_basis_policy: CostBasisPolicy::default(),
            validation: ValidationPolicy::default(),
            recompute_concurrency: DEFAULT_RECOMPUTE_CONCURRENCY,
            delete_empty_holdings: true,
        }
    }
}

impl EngineConfig {
    /// Checks values that serde cannot constrain on its own.
    pub fn validate(&self) -> Result<()> {
        if self.recompute_concurrency == 0 {
            return Err(Error::InvalidConfigValue(
                "recompute_concurrency must be at least 1".to_string(),
            ));
        }
        if self.validation.total_amount_tolerance.is_sign_negative() {
            return Err(Error::InvalidConfigValue(
                "total_amount_tolerance cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}
