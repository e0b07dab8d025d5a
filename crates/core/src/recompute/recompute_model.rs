use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cost_basis_calculator::CostBasisCalculation;
use crate::holdings::Holding;

/// A holding whose history sells more shares than it held.
///
/// The reported quantity is clamped at zero; this records what the raw
/// history actually computed so operators can repair it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityAnomaly {
    pub holding_id: String,
    pub symbol: String,
    /// Final quantity before clamping.
    pub computed_quantity: Decimal,
    pub first_oversold_transaction_id: Option<String>,
}

impl IntegrityAnomaly {
    pub fn from_calculation(holding: &Holding, calculation: &CostBasisCalculation) -> Option<Self> {
        if !calculation.has_integrity_anomaly() {
            return None;
        }
        Some(Self {
            holding_id: holding.id.clone(),
            symbol: holding.symbol.clone(),
            computed_quantity: calculation.unclamped_quantity,
            first_oversold_transaction_id: calculation.first_oversold_transaction_id.clone(),
        })
    }
}

impl std::fmt::Display for IntegrityAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "holding {} ({}) is oversold: computed quantity {}",
            self.holding_id, self.symbol, self.computed_quantity
        )?;
        if let Some(transaction_id) = &self.first_oversold_transaction_id {
            write!(f, ", first oversold at transaction {}", transaction_id)?;
        }
        Ok(())
    }
}

/// One holding re-derived and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingRecomputeOutcome {
    pub holding: Holding,
    /// Transactions whose cost snapshot changed and was rewritten.
    pub transactions_annotated: usize,
    pub anomaly: Option<IntegrityAnomaly>,
}

/// One holding of a batch that could not be recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingRecomputeFailure {
    pub holding_id: String,
    pub symbol: String,
    pub error: String,
}

/// Per-holding results of a portfolio or owner-wide recompute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecomputeResult {
    pub recomputed: Vec<HoldingRecomputeOutcome>,
    pub failures: Vec<HoldingRecomputeFailure>,
}

impl BatchRecomputeResult {
    /// The recomputed holdings, in result order.
    pub fn holdings(&self) -> Vec<&Holding> {
        self.recomputed.iter().map(|o| &o.holding).collect()
    }

    pub fn recomputed_count(&self) -> usize {
        self.recomputed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn anomalies(&self) -> Vec<&IntegrityAnomaly> {
        self.recomputed
            .iter()
            .filter_map(|o| o.anomaly.as_ref())
            .collect()
    }
}
