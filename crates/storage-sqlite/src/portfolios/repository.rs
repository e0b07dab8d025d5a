use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;

use costfolio_core::errors::{NotFoundError, Result};
use costfolio_core::portfolios::{NewPortfolio, Portfolio, PortfolioRepositoryTrait};

use super::model::PortfolioDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::portfolios;

/// Repository for portfolio rows.
pub struct PortfolioRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PortfolioRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl PortfolioRepositoryTrait for PortfolioRepository {
    fn get_portfolio(&self, portfolio_id: &str) -> Result<Portfolio> {
        let mut conn = get_connection(&self.pool)?;

        let row = portfolios::table
            .select(PortfolioDB::as_select())
            .find(portfolio_id)
            .first::<PortfolioDB>(&mut conn)
            .optional()
            .into_core()?
            .ok_or_else(|| NotFoundError::portfolio(portfolio_id))?;

        Portfolio::try_from(row).map_err(Into::into)
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Portfolio>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = portfolios::table
            .filter(portfolios::owner_id.eq(owner_id))
            .select(PortfolioDB::as_select())
            .order((portfolios::created_at.asc(), portfolios::id.asc()))
            .load::<PortfolioDB>(&mut conn)
            .into_core()?;

        rows.into_iter()
            .map(|row| Portfolio::try_from(row).map_err(Into::into))
            .collect()
    }

    async fn create_portfolio(&self, new_portfolio: NewPortfolio) -> Result<Portfolio> {
        new_portfolio.validate()?;
        let portfolio = new_portfolio.into_portfolio(Utc::now());

        self.writer
            .exec(move |conn| {
                diesel::insert_into(portfolios::table)
                    .values(&PortfolioDB::from(&portfolio))
                    .execute(conn)
                    .into_core()?;
                Ok(portfolio)
            })
            .await
    }
}
