//! Utility functions for SQLite storage operations.
//!
//! Decimals and timestamps are stored as TEXT. Timestamps use a fixed-width
//! RFC 3339 form (microseconds, `Z` suffix) so lexical order matches
//! chronological order in `ORDER BY`.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::errors::StorageError;

/// Maximum number of parameters for SQLite IN (...) queries.
///
/// SQLite caps bound parameters per statement (SQLITE_MAX_VARIABLE_NUMBER,
/// typically 999); 500 leaves room for the rest of the query.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Chunk a slice into smaller slices for batch SQLite queries.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::CorruptValue(format!("{} '{}': {}", field, value, e)))
}

pub fn parse_decimal(value: &str, field: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(value)
        .map_err(|e| StorageError::CorruptValue(format!("{} '{}': {}", field, value, e)))
}

pub fn parse_optional_decimal(
    value: Option<&str>,
    field: &str,
) -> Result<Option<Decimal>, StorageError> {
    value.map(|v| parse_decimal(v, field)).transpose()
}
