use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, ValidationError};

/// A named collection of holdings belonging to one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolio {
    pub id: Option<String>,
    pub owner_id: String,
    pub name: String,
    pub currency: String,
}

impl NewPortfolio {
    pub fn validate(&self) -> Result<()> {
        if self.owner_id.trim().is_empty() {
            return Err(ValidationError::MissingField("owner_id".to_string()).into());
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        if self.currency.chars().count() != 3 {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()).into());
        }
        Ok(())
    }

    pub fn into_portfolio(self, now: DateTime<Utc>) -> Portfolio {
        Portfolio {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            owner_id: self.owner_id,
            name: self.name.trim().to_string(),
            currency: self.currency.to_uppercase(),
            created_at: now,
            updated_at: now,
        }
    }
}
