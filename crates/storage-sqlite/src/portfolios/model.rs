//! Database model for portfolios.

use diesel::prelude::*;

use costfolio_core::portfolios::Portfolio;

use crate::errors::StorageError;
use crate::utils::{format_timestamp, parse_timestamp};

/// Database model for portfolios
#[derive(Queryable, Identifiable, Insertable, AsChangeset, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::portfolios)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PortfolioDB {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub currency: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Portfolio> for PortfolioDB {
    fn from(portfolio: &Portfolio) -> Self {
        Self {
            id: portfolio.id.clone(),
            owner_id: portfolio.owner_id.clone(),
            name: portfolio.name.clone(),
            currency: portfolio.currency.clone(),
            created_at: format_timestamp(&portfolio.created_at),
            updated_at: format_timestamp(&portfolio.updated_at),
        }
    }
}

impl TryFrom<PortfolioDB> for Portfolio {
    type Error = StorageError;

    fn try_from(db: PortfolioDB) -> Result<Self, Self::Error> {
        Ok(Self {
            created_at: parse_timestamp(&db.created_at, "portfolios.created_at")?,
            updated_at: parse_timestamp(&db.updated_at, "portfolios.updated_at")?,
            id: db.id,
            owner_id: db.owner_id,
            name: db.name,
            currency: db.currency,
        })
    }
}
