//! Database model for transactions.

use diesel::prelude::*;
use std::str::FromStr;

use costfolio_core::transactions::{Transaction, TransactionType};

use crate::errors::StorageError;
use crate::utils::{format_timestamp, parse_decimal, parse_optional_decimal, parse_timestamp};

/// Database model for transactions
#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct TransactionDB {
    pub id: String,
    pub holding_id: String,
    pub transaction_type: String,
    pub quantity: String,
    pub price_per_share: String,
    pub total_amount: Option<String>,
    pub fees: String,
    pub currency: String,
    pub exchange_rate: String,
    pub transaction_date: String,
    pub average_cost_per_share_at_transaction: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Transaction> for TransactionDB {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id.clone(),
            holding_id: transaction.holding_id.clone(),
            transaction_type: transaction.transaction_type.as_str().to_string(),
            quantity: transaction.quantity.to_string(),
            price_per_share: transaction.price_per_share.to_string(),
            total_amount: transaction.total_amount.map(|v| v.to_string()),
            fees: transaction.fees.to_string(),
            currency: transaction.currency.clone(),
            exchange_rate: transaction.exchange_rate.to_string(),
            transaction_date: format_timestamp(&transaction.transaction_date),
            average_cost_per_share_at_transaction: transaction
                .average_cost_per_share_at_transaction
                .map(|v| v.to_string()),
            notes: transaction.notes.clone(),
            created_at: format_timestamp(&transaction.created_at),
            updated_at: format_timestamp(&transaction.updated_at),
        }
    }
}

impl TryFrom<TransactionDB> for Transaction {
    type Error = StorageError;

    fn try_from(db: TransactionDB) -> Result<Self, Self::Error> {
        Ok(Self {
            transaction_type: TransactionType::from_str(&db.transaction_type)
                .map_err(StorageError::CorruptValue)?,
            quantity: parse_decimal(&db.quantity, "transactions.quantity")?,
            price_per_share: parse_decimal(&db.price_per_share, "transactions.price_per_share")?,
            total_amount: parse_optional_decimal(
                db.total_amount.as_deref(),
                "transactions.total_amount",
            )?,
            fees: parse_decimal(&db.fees, "transactions.fees")?,
            exchange_rate: parse_decimal(&db.exchange_rate, "transactions.exchange_rate")?,
            transaction_date: parse_timestamp(
                &db.transaction_date,
                "transactions.transaction_date",
            )?,
            average_cost_per_share_at_transaction: parse_optional_decimal(
                db.average_cost_per_share_at_transaction.as_deref(),
                "transactions.average_cost_per_share_at_transaction",
            )?,
            created_at: parse_timestamp(&db.created_at, "transactions.created_at")?,
            updated_at: parse_timestamp(&db.updated_at, "transactions.updated_at")?,
            id: db.id,
            holding_id: db.holding_id,
            currency: db.currency,
            notes: db.notes,
        })
    }
}

/// Converts loaded rows, failing on the first corrupt one.
pub(crate) fn into_transactions(rows: Vec<TransactionDB>) -> Result<Vec<Transaction>, StorageError> {
    rows.into_iter().map(Transaction::try_from).collect()
}
