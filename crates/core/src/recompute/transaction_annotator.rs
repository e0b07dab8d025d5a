use super::cost_basis_calculator::{sort_chronologically, CostBasisAccumulator};
use crate::config::CostBasisPolicy;
use crate::errors::ValidationError;
use crate::transactions::Transaction;

/// Stamps every transaction with the average cost in effect immediately
/// before it applied.
///
/// Sorts `transactions` into chronological order in place and returns the ids
/// whose snapshot changed, so callers only persist what moved. On an
/// out-of-range history the snapshots may be partially rewritten.
pub fn annotate_transactions(
    transactions: &mut [Transaction],
    policy: CostBasisPolicy,
) -> Result<Vec<String>, ValidationError> {
    sort_chronologically(transactions);

    let mut accumulator = CostBasisAccumulator::new(policy);
    let mut changed = Vec::new();

    for transaction in transactions.iter_mut() {
        let avg_cost_before = Some(accumulator.average_cost()?);
        if transaction.average_cost_per_share_at_transaction != avg_cost_before {
            transaction.average_cost_per_share_at_transaction = avg_cost_before;
            changed.push(transaction.id.clone());
        }
        accumulator.apply(transaction)?;
    }

    Ok(changed)
}
