//! Database model for holdings.

use diesel::prelude::*;

use costfolio_core::holdings::Holding;

use crate::errors::StorageError;
use crate::utils::{format_timestamp, parse_decimal, parse_timestamp};

/// Database model for holdings
#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::holdings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub struct HoldingDB {
    pub id: String,
    pub portfolio_id: String,
    pub symbol: String,
    pub name: Option<String>,
    pub current_quantity: String,
    pub average_cost_per_share: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Holding> for HoldingDB {
    fn from(holding: &Holding) -> Self {
        Self {
            id: holding.id.clone(),
            portfolio_id: holding.portfolio_id.clone(),
            symbol: holding.symbol.clone(),
            name: holding.name.clone(),
            current_quantity: holding.current_quantity.to_string(),
            average_cost_per_share: holding.average_cost_per_share.to_string(),
            created_at: format_timestamp(&holding.created_at),
            updated_at: format_timestamp(&holding.updated_at),
        }
    }
}

impl TryFrom<HoldingDB> for Holding {
    type Error = StorageError;

    fn try_from(db: HoldingDB) -> Result<Self, Self::Error> {
        Ok(Self {
            current_quantity: parse_decimal(&db.current_quantity, "holdings.current_quantity")?,
            average_cost_per_share: parse_decimal(
                &db.average_cost_per_share,
                "holdings.average_cost_per_share",
            )?,
            created_at: parse_timestamp(&db.created_at, "holdings.created_at")?,
            updated_at: parse_timestamp(&db.updated_at, "holdings.updated_at")?,
            id: db.id,
            portfolio_id: db.portfolio_id,
            symbol: db.symbol,
            name: db.name,
        })
    }
}
