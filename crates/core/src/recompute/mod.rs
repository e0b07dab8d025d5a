//! Recompute module - derives holding aggregates and per-transaction cost
//! snapshots from transaction histories.
//!
//! The calculator and annotator are pure. [`RecomputeService`] wraps them
//! with lookups, per-holding locking and atomic persistence.

mod cost_basis_calculator;
mod holding_locks;
mod recompute_model;
mod recompute_service;
mod recompute_traits;
mod transaction_annotator;



pub use cost_basis_calculator::{
    calculate_cost_basis, sort_chronologically, CostBasisAccumulator, CostBasisCalculation,
};
pub use holding_locks::HoldingLocks;
pub use recompute_model::{
    BatchRecomputeResult, HoldingRecomputeFailure, HoldingRecomputeOutcome, IntegrityAnomaly,
};
pub use recompute_service::RecomputeService;
pub use recompute_traits::RecomputeServiceTrait;
pub use transaction_annotator::annotate_transactions;

pub(crate) use recompute_service::{derive_holding, publish_recompute_events};
