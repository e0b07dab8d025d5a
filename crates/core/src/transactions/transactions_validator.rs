//! Field-level business rules applied before a transaction enters a history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::transactions_model::{effective_cost, gross_amount, NewTransaction, Transaction};
use crate::config::ValidationPolicy;
use crate::errors::ValidationError;

/// The economic fields every rule looks at, borrowed from either input shape.
struct Candidate<'a> {
    quantity: Decimal,
    price_per_share: Decimal,
    fees: Decimal,
    exchange_rate: Decimal,
    currency: &'a str,
    transaction_date: DateTime<Utc>,
    total_amount: Option<Decimal>,
}

/// Pure validator. Holds only the strictness policy.
#[derive(Debug, Clone, Default)]
pub struct TransactionValidator {
    policy: ValidationPolicy,
}

impl TransactionValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// Validates a stored (or patched) transaction against the current instant.
    pub fn validate(&self, transaction: &Transaction) -> Result<(), ValidationError> {
        self.validate_at(transaction, Utc::now())
    }

    pub fn validate_at(
        &self,
        transaction: &Transaction,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        self.check(
            &Candidate {
                quantity: transaction.quantity,
                price_per_share: transaction.price_per_share,
                fees: transaction.fees,
                exchange_rate: transaction.exchange_rate,
                currency: &transaction.currency,
                transaction_date: transaction.transaction_date,
                total_amount: transaction.total_amount,
            },
            now,
        )
    }

    /// Validates creation input, applying the same defaults creation will apply.
    pub fn validate_new(&self, new_transaction: &NewTransaction) -> Result<(), ValidationError> {
        self.validate_new_at(new_transaction, Utc::now())
    }

    pub fn validate_new_at(
        &self,
        new_transaction: &NewTransaction,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        self.check(
            &Candidate {
                quantity: new_transaction.quantity,
                price_per_share: new_transaction.price_per_share,
                fees: new_transaction.fees_or_zero(),
                exchange_rate: new_transaction.exchange_rate_or_one(),
                currency: &new_transaction.currency,
                transaction_date: new_transaction.transaction_date,
                total_amount: new_transaction.total_amount,
            },
            now,
        )
    }

    fn check(&self, candidate: &Candidate<'_>, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if candidate.quantity <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveQuantity(candidate.quantity));
        }
        if candidate.price_per_share <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice(candidate.price_per_share));
        }
        if candidate.fees < Decimal::ZERO {
            return Err(ValidationError::NegativeFees(candidate.fees));
        }
        if candidate.exchange_rate <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveExchangeRate(
                candidate.exchange_rate,
            ));
        }
        if candidate.currency.chars().count() != 3 {
            return Err(ValidationError::InvalidCurrency(
                candidate.currency.to_string(),
            ));
        }
        if candidate.transaction_date > now {
            return Err(ValidationError::FutureDate(candidate.transaction_date));
        }

        let expected = gross_amount(
            candidate.quantity,
            candidate.price_per_share,
            candidate.fees,
        )
        .ok_or_else(|| ValidationError::AmountOutOfRange("Gross amount".to_string()))?;
        effective_cost(
            candidate.quantity,
            candidate.price_per_share,
            candidate.fees,
            candidate.exchange_rate,
        )
        .ok_or_else(|| ValidationError::AmountOutOfRange("Converted cost".to_string()))?;

        if self.policy.strict_total_amount {
            let provided = candidate
                .total_amount
                .ok_or_else(|| ValidationError::MissingField("total_amount".to_string()))?;
            let difference = provided
                .checked_sub(expected)
                .ok_or_else(|| ValidationError::AmountOutOfRange("Total amount".to_string()))?;
            if difference.abs() > self.policy.total_amount_tolerance {
                return Err(ValidationError::TotalAmountMismatch { provided, expected });
            }
        }

        Ok(())
    }
}
