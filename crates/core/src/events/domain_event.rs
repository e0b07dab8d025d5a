//! Domain event types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Domain events emitted by core services after successful writes.
///
/// Events describe facts about committed data. They are emitted only after
/// the corresponding write has been persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Transactions of a holding were created, updated, or deleted.
    TransactionsChanged {
        portfolio_id: String,
        holding_id: String,
        transaction_ids: Vec<String>,
    },

    /// A holding's quantity and average cost were re-derived and saved.
    HoldingRecomputed {
        portfolio_id: String,
        holding_id: String,
    },

    /// A holding was removed after its last transaction was deleted.
    HoldingDeleted {
        portfolio_id: String,
        holding_id: String,
    },

    /// Replaying a holding's history drove the running quantity below zero.
    IntegrityAnomalyDetected {
        holding_id: String,
        symbol: String,
        computed_quantity: Decimal,
    },
}

impl DomainEvent {
    /// Creates a TransactionsChanged event.
    pub fn transactions_changed(
        portfolio_id: impl Into<String>,
        holding_id: impl Into<String>,
        transaction_ids: Vec<String>,
    ) -> Self {
        Self::TransactionsChanged {
            portfolio_id: portfolio_id.into(),
            holding_id: holding_id.into(),
            transaction_ids,
        }
    }

    /// Creates a HoldingRecomputed event.
    pub fn holding_recomputed(
        portfolio_id: impl Into<String>,
        holding_id: impl Into<String>,
    ) -> Self {
        Self::HoldingRecomputed {
            portfolio_id: portfolio_id.into(),
            holding_id: holding_id.into(),
        }
    }

    /// Creates a HoldingDeleted event.
    pub fn holding_deleted(portfolio_id: impl Into<String>, holding_id: impl Into<String>) -> Self {
        Self::HoldingDeleted {
            portfolio_id: portfolio_id.into(),
            holding_id: holding_id.into(),
        }
    }

    /// Creates an IntegrityAnomalyDetected event.
    pub fn integrity_anomaly_detected(
        holding_id: impl Into<String>,
        symbol: impl Into<String>,
        computed_quantity: Decimal,
    ) -> Self {
        Self::IntegrityAnomalyDetected {
            holding_id: holding_id.into(),
            symbol: symbol.into(),
            computed_quantity,
        }
    }

    /// Holding the event refers to.
    pub fn holding_id(&self) -> &str {
        match self {
            DomainEvent::TransactionsChanged { holding_id, .. }
            | DomainEvent::HoldingRecomputed { holding_id, .. }
            | DomainEvent::HoldingDeleted { holding_id, .. }
            | DomainEvent::IntegrityAnomalyDetected { holding_id, .. } => holding_id,
        }
    }
}
