//! Transaction domain models.

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::transactions_constants::*;

/// Kind of event recorded against a holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
    Dividend,
    Split,
    TransferIn,
    TransferOut,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => TRANSACTION_TYPE_BUY,
            TransactionType::Sell => TRANSACTION_TYPE_SELL,
            TransactionType::Dividend => TRANSACTION_TYPE_DIVIDEND,
            TransactionType::Split => TRANSACTION_TYPE_SPLIT,
            TransactionType::TransferIn => TRANSACTION_TYPE_TRANSFER_IN,
            TransactionType::TransferOut => TRANSACTION_TYPE_TRANSFER_OUT,
        }
    }

    /// BUY and TRANSFER_IN add shares and feed the cost basis.
    pub fn is_acquisition(&self) -> bool {
        matches!(self, TransactionType::Buy | TransactionType::TransferIn)
    }

    /// SELL and TRANSFER_OUT remove shares.
    pub fn is_disposal(&self) -> bool {
        matches!(self, TransactionType::Sell | TransactionType::TransferOut)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            s if s == TRANSACTION_TYPE_BUY => Ok(TransactionType::Buy),
            s if s == TRANSACTION_TYPE_SELL => Ok(TransactionType::Sell),
            s if s == TRANSACTION_TYPE_DIVIDEND => Ok(TransactionType::Dividend),
            s if s == TRANSACTION_TYPE_SPLIT => Ok(TransactionType::Split),
            s if s == TRANSACTION_TYPE_TRANSFER_IN => Ok(TransactionType::TransferIn),
            s if s == TRANSACTION_TYPE_TRANSFER_OUT => Ok(TransactionType::TransferOut),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

/// A single event in a holding's history.
///
/// Economic fields (type, quantity, price, fees, currency, exchange rate,
/// date) only change through an explicit [`TransactionUpdate`]. The
/// `average_cost_per_share_at_transaction` snapshot is derived by the
/// annotator and is never user-supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub holding_id: String,
    pub transaction_type: TransactionType,
    pub quantity: Decimal,
    pub price_per_share: Decimal,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    pub fees: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub transaction_date: DateTime<Utc>,
    #[serde(default)]
    pub average_cost_per_share_at_transaction: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Cost this transaction adds to the basis when it is an acquisition.
    ///
    /// `None` when the amount is outside the decimal range.
    pub fn effective_cost(&self) -> Option<Decimal> {
        effective_cost(
            self.quantity,
            self.price_per_share,
            self.fees,
            self.exchange_rate,
        )
    }

    /// Chronological position: date, then creation time, then id.
    pub fn ordering_key(&self) -> (DateTime<Utc>, DateTime<Utc>, &str) {
        (self.transaction_date, self.created_at, self.id.as_str())
    }
}

/// Drops sub-microsecond precision so ordering survives a storage round trip.
pub fn truncate_timestamp(value: DateTime<Utc>) -> DateTime<Utc> {
    value.trunc_subsecs(TIMESTAMP_SUBSEC_DIGITS)
}

/// `quantity * price_per_share + fees`, the value `total_amount` is checked against.
pub fn gross_amount(
    quantity: Decimal,
    price_per_share: Decimal,
    fees: Decimal,
) -> Option<Decimal> {
    quantity.checked_mul(price_per_share)?.checked_add(fees)
}

/// `quantity * price_per_share + fees / exchange_rate`.
///
/// `None` on overflow or a zero exchange rate.
pub fn effective_cost(
    quantity: Decimal,
    price_per_share: Decimal,
    fees: Decimal,
    exchange_rate: Decimal,
) -> Option<Decimal> {
    let converted_fees = fees.checked_div(exchange_rate)?;
    quantity
        .checked_mul(price_per_share)?
        .checked_add(converted_fees)
}

/// Input model for recording a new transaction in a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    /// Symbol of the holding; the holding is created on first use.
    pub symbol: String,
    pub name: Option<String>,
    pub transaction_type: TransactionType,
    pub quantity: Decimal,
    pub price_per_share: Decimal,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub fees: Option<Decimal>,
    pub currency: String,
    #[serde(default)]
    pub exchange_rate: Option<Decimal>,
    pub transaction_date: DateTime<Utc>,
    pub notes: Option<String>,
}

impl NewTransaction {
    pub fn fees_or_zero(&self) -> Decimal {
        self.fees.unwrap_or(Decimal::ZERO)
    }

    pub fn exchange_rate_or_one(&self) -> Decimal {
        self.exchange_rate.unwrap_or(Decimal::ONE)
    }

    /// Materializes the input as a transaction of `holding_id`.
    ///
    /// Ids are UUID v7 so that ids created later sort later, which keeps the
    /// final tie-break of [`Transaction::ordering_key`] aligned with insertion order.
    pub fn into_transaction(self, holding_id: &str, now: DateTime<Utc>) -> Transaction {
        let now = truncate_timestamp(now);
        let fees = self.fees_or_zero();
        let exchange_rate = self.exchange_rate_or_one();
        Transaction {
            id: Uuid::now_v7().to_string(),
            holding_id: holding_id.to_string(),
            transaction_type: self.transaction_type,
            quantity: self.quantity,
            price_per_share: self.price_per_share,
            total_amount: self.total_amount,
            fees,
            currency: self.currency,
            exchange_rate,
            transaction_date: truncate_timestamp(self.transaction_date),
            average_cost_per_share_at_transaction: None,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Merge-patch for an existing transaction.
///
/// Absent fields are left unchanged. For the nullable fields (`total_amount`,
/// `notes`) an explicit `null` clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    pub transaction_type: Option<TransactionType>,
    pub quantity: Option<Decimal>,
    pub price_per_share: Option<Decimal>,
    #[serde(default, deserialize_with = "patch_format::deserialize_patch")]
    pub total_amount: Option<Option<Decimal>>,
    pub fees: Option<Decimal>,
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub transaction_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "patch_format::deserialize_patch")]
    pub notes: Option<Option<String>>,
}

impl TransactionUpdate {
    pub fn is_empty(&self) -> bool {
        self.transaction_type.is_none()
            && self.quantity.is_none()
            && self.price_per_share.is_none()
            && self.total_amount.is_none()
            && self.fees.is_none()
            && self.currency.is_none()
            && self.exchange_rate.is_none()
            && self.transaction_date.is_none()
            && self.notes.is_none()
    }

    /// True when the patch touches a field the cost basis depends on.
    pub fn changes_economics(&self) -> bool {
        self.transaction_type.is_some()
            || self.quantity.is_some()
            || self.price_per_share.is_some()
            || self.fees.is_some()
            || self.exchange_rate.is_some()
            || self.transaction_date.is_some()
    }

    /// Applies every set field to `transaction`. Identity, ownership and the
    /// derived snapshot are not patchable.
    pub fn apply_to(self, transaction: &mut Transaction) {
        if let Some(transaction_type) = self.transaction_type {
            transaction.transaction_type = transaction_type;
        }
        if let Some(quantity) = self.quantity {
            transaction.quantity = quantity;
        }
        if let Some(price) = self.price_per_share {
            transaction.price_per_share = price;
        }
        if let Some(total_amount) = self.total_amount {
            transaction.total_amount = total_amount;
        }
        if let Some(fees) = self.fees {
            transaction.fees = fees;
        }
        if let Some(currency) = self.currency {
            transaction.currency = currency;
        }
        if let Some(rate) = self.exchange_rate {
            transaction.exchange_rate = rate;
        }
        if let Some(date) = self.transaction_date {
            transaction.transaction_date = truncate_timestamp(date);
        }
        if let Some(notes) = self.notes {
            transaction.notes = notes;
        }
    }
}

/// Result of deleting a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDeletion {
    pub transaction_id: String,
    pub holding_id: String,
    /// The holding was removed because nothing was left in it.
    pub holding_deleted: bool,
}

mod patch_format {
    use super::*;

    /// Distinguishes an explicit `null` (`Some(None)`) from an absent field
    /// (`None`, via `#[serde(default)]`).
    pub fn deserialize_patch<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
