use log::trace;
use rust_decimal::Decimal;

use crate::config::CostBasisPolicy;
use crate::errors::ValidationError;
use crate::transactions::Transaction;

fn out_of_range(what: &str) -> ValidationError {
    ValidationError::AmountOutOfRange(what.to_string())
}

/// Running cost basis state shared by the calculator and the annotator.
///
/// Under [`CostBasisPolicy::WeightedAverageOfBuys`] the totals are cumulative
/// acquisitions and disposals never touch them. Under
/// [`CostBasisPolicy::ProportionalReduction`] they describe the shares still
/// held, and each disposal removes its proportional share of cost.
#[derive(Debug, Clone, PartialEq)]
pub struct CostBasisAccumulator {
    policy: CostBasisPolicy,
    cost_total: Decimal,
    quantity_total: Decimal,
}

impl CostBasisAccumulator {
    pub fn new(policy: CostBasisPolicy) -> Self {
        Self {
            policy,
            cost_total: Decimal::ZERO,
            quantity_total: Decimal::ZERO,
        }
    }

    pub fn cost_total(&self) -> Decimal {
        self.cost_total
    }

    pub fn quantity_total(&self) -> Decimal {
        self.quantity_total
    }

    /// `cost_total / quantity_total`, or zero when the quantity total is not positive.
    pub fn average_cost(&self) -> Result<Decimal, ValidationError> {
        if self.quantity_total > Decimal::ZERO {
            self.cost_total
                .checked_div(self.quantity_total)
                .ok_or_else(|| out_of_range("Average cost"))
        } else {
            Ok(Decimal::ZERO)
        }
    }

    /// Folds one transaction into the running totals.
    ///
    /// Fails without touching the totals when the result would leave the decimal range.
    pub fn apply(&mut self, transaction: &Transaction) -> Result<(), ValidationError> {
        if transaction.transaction_type.is_acquisition() {
            let cost_total = transaction
                .effective_cost()
                .and_then(|cost| self.cost_total.checked_add(cost))
                .ok_or_else(|| out_of_range("Cost basis"))?;
            let quantity_total = self
                .quantity_total
                .checked_add(transaction.quantity)
                .ok_or_else(|| out_of_range("Quantity"))?;
            self.cost_total = cost_total;
            self.quantity_total = quantity_total;
        } else if transaction.transaction_type.is_disposal()
            && self.policy == CostBasisPolicy::ProportionalReduction
        {
            self.reduce_proportionally(transaction.quantity)?;
        }
        Ok(())
    }

    fn reduce_proportionally(&mut self, quantity: Decimal) -> Result<(), ValidationError> {
        let held = self.quantity_total;
        if held <= Decimal::ZERO {
            return Ok(());
        }
        let removed = quantity.min(held);
        if removed == held {
            self.cost_total = Decimal::ZERO;
            self.quantity_total = Decimal::ZERO;
            return Ok(());
        }
        let removed_cost = self
            .cost_total
            .checked_mul(removed)
            .and_then(|cost| cost.checked_div(held))
            .ok_or_else(|| out_of_range("Cost basis"))?;
        self.cost_total -= removed_cost;
        self.quantity_total -= removed;
        Ok(())
    }
}

/// Result of replaying a holding's history.
#[derive(Debug, Clone, PartialEq)]
pub struct CostBasisCalculation {
    /// Final quantity, clamped at zero.
    pub quantity: Decimal,
    pub average_cost_per_share: Decimal,
    /// Final quantity before clamping. Negative only for oversold histories.
    pub unclamped_quantity: Decimal,
    /// First transaction after which the running quantity was below zero.
    pub first_oversold_transaction_id: Option<String>,
}

impl CostBasisCalculation {
    /// True when the history sold more than it held at some point.
    pub fn has_integrity_anomaly(&self) -> bool {
        self.first_oversold_transaction_id.is_some()
    }
}

/// Orders transactions by date, then creation time, then id.
pub fn sort_chronologically(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));
}

/// Replays `transactions` in chronological order and returns the holding's
/// quantity and average cost per share.
///
/// The input order does not matter. The result is a pure function of the
/// transaction set and the policy. Histories whose totals leave the decimal
/// range are rejected instead of being rounded.
pub fn calculate_cost_basis(
    transactions: &[Transaction],
    policy: CostBasisPolicy,
) -> Result<CostBasisCalculation, ValidationError> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by(|a, b| a.ordering_key().cmp(&b.ordering_key()));

    let mut accumulator = CostBasisAccumulator::new(policy);
    let mut quantity = Decimal::ZERO;
    let mut first_oversold_transaction_id = None;

    for transaction in ordered {
        if transaction.transaction_type.is_acquisition() {
            quantity = quantity
                .checked_add(transaction.quantity)
                .ok_or_else(|| out_of_range("Quantity"))?;
        } else if transaction.transaction_type.is_disposal() {
            quantity = quantity
                .checked_sub(transaction.quantity)
                .ok_or_else(|| out_of_range("Quantity"))?;
            if quantity < Decimal::ZERO && first_oversold_transaction_id.is_none() {
                first_oversold_transaction_id = Some(transaction.id.clone());
            }
        }
        accumulator.apply(transaction)?;
        trace!(
            "{} {} -> quantity {}, cost total {}",
            transaction.transaction_type,
            transaction.id,
            quantity,
            accumulator.cost_total()
        );
    }

    Ok(CostBasisCalculation {
        quantity: quantity.max(Decimal::ZERO),
        average_cost_per_share: accumulator.average_cost()?,
        unclamped_quantity: quantity,
        first_oversold_transaction_id,
    })
}
