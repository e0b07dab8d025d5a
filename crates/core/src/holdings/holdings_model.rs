use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Position in one symbol within a portfolio.
///
/// `current_quantity` and `average_cost_per_share` are derived from the
/// holding's transactions and are only written by the recompute path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: String,
    pub portfolio_id: String,
    pub symbol: String,
    pub name: Option<String>,
    pub current_quantity: Decimal,
    pub average_cost_per_share: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    /// A holding with no remaining transactions and nothing held is removed.
    pub fn is_eligible_for_cleanup(&self, remaining_transactions: usize) -> bool {
        remaining_transactions == 0 && self.current_quantity.is_zero()
    }

    /// Book value of the position at its average cost.
    pub fn cost_basis(&self) -> Decimal {
        self.current_quantity * self.average_cost_per_share
    }
}

/// Input for creating a holding the first time a symbol is traded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHolding {
    pub id: Option<String>,
    pub portfolio_id: String,
    pub symbol: String,
    pub name: Option<String>,
}

impl NewHolding {
    /// Normalizes the symbol and defaults the display name to it.
    pub fn for_symbol(portfolio_id: &str, symbol: &str, name: Option<String>) -> Self {
        let symbol = normalize_symbol(symbol);
        let name = name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| Some(symbol.clone()));
        Self {
            id: None,
            portfolio_id: portfolio_id.to_string(),
            symbol,
            name,
        }
    }

    /// Materializes the holding with zero quantity and cost.
    pub fn into_holding(self, now: DateTime<Utc>) -> Holding {
        Holding {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            portfolio_id: self.portfolio_id,
            symbol: self.symbol,
            name: self.name,
            current_quantity: Decimal::ZERO,
            average_cost_per_share: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Symbols are stored trimmed and upper-cased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
