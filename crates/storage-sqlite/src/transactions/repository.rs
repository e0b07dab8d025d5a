use diesel::prelude::*;
use std::sync::Arc;

use costfolio_core::errors::{NotFoundError, Result};
use costfolio_core::transactions::{Transaction, TransactionRepositoryTrait};

use super::model::{into_transactions, TransactionDB};
use crate::db::{get_connection, DbPool};
use crate::errors::IntoCore;
use crate::schema::{holdings, transactions};

/// Read side for transactions. Writes go through the holding repository.
pub struct TransactionRepository {
    pool: Arc<DbPool>,
}

impl TransactionRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl TransactionRepositoryTrait for TransactionRepository {
    fn get_transaction(&self, transaction_id: &str) -> Result<Transaction> {
        let mut conn = get_connection(&self.pool)?;

        let row = transactions::table
            .select(TransactionDB::as_select())
            .find(transaction_id)
            .first::<TransactionDB>(&mut conn)
            .optional()
            .into_core()?
            .ok_or_else(|| NotFoundError::transaction(transaction_id))?;

        Transaction::try_from(row).map_err(Into::into)
    }

    fn list_transactions(&self, holding_id: &str) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = transactions::table
            .filter(transactions::holding_id.eq(holding_id))
            .select(TransactionDB::as_select())
            .order((
                transactions::transaction_date.asc(),
                transactions::created_at.asc(),
                transactions::id.asc(),
            ))
            .load::<TransactionDB>(&mut conn)
            .into_core()?;

        Ok(into_transactions(rows)?)
    }

    fn list_by_portfolio(
        &self,
        portfolio_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = transactions::table
            .inner_join(holdings::table)
            .filter(holdings::portfolio_id.eq(portfolio_id))
            .select(TransactionDB::as_select())
            .order((
                transactions::transaction_date.desc(),
                transactions::created_at.desc(),
                transactions::id.desc(),
            ))
            .limit(limit)
            .offset(offset)
            .load::<TransactionDB>(&mut conn)
            .into_core()?;

        Ok(into_transactions(rows)?)
    }

    fn count_by_holding(&self, holding_id: &str) -> Result<usize> {
        let mut conn = get_connection(&self.pool)?;

        let count: i64 = transactions::table
            .filter(transactions::holding_id.eq(holding_id))
            .count()
            .get_result(&mut conn)
            .into_core()?;

        Ok(count as usize)
    }
}
