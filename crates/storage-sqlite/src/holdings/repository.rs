use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use std::sync::Arc;

use costfolio_core::errors::{NotFoundError, Result};
use costfolio_core::holdings::{normalize_symbol, Holding, HoldingRepositoryTrait, NewHolding};
use costfolio_core::transactions::Transaction;

use super::model::HoldingDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::{holdings, transactions};
use crate::transactions::TransactionDB;
use crate::utils::chunk_for_sqlite;

/// Repository for holdings.
///
/// Aggregate updates and the transaction rows they were derived from are
/// always written in a single writer job, so readers never observe one
/// without the other.
pub struct HoldingRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl HoldingRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

fn into_holdings(rows: Vec<HoldingDB>) -> Result<Vec<Holding>> {
    rows.into_iter()
        .map(|row| Holding::try_from(row).map_err(Into::into))
        .collect()
}

/// Updates the holding row and upserts `rows`. Runs inside the writer's transaction.
fn write_holding(
    conn: &mut SqliteConnection,
    holding: &HoldingDB,
    rows: &[TransactionDB],
) -> Result<()> {
    let updated = diesel::update(holdings::table.find(&holding.id))
        .set(holding)
        .execute(conn)
        .into_core()?;
    if updated == 0 {
        return Err(NotFoundError::holding(holding.id.as_str()).into());
    }

    for row in rows {
        diesel::insert_into(transactions::table)
            .values(row)
            .on_conflict(transactions::id)
            .do_update()
            .set(row)
            .execute(conn)
            .into_core()?;
    }
    Ok(())
}

#[async_trait]
impl HoldingRepositoryTrait for HoldingRepository {
    fn get_holding(&self, holding_id: &str) -> Result<Holding> {
        let mut conn = get_connection(&self.pool)?;

        let row = holdings::table
            .select(HoldingDB::as_select())
            .find(holding_id)
            .first::<HoldingDB>(&mut conn)
            .optional()
            .into_core()?
            .ok_or_else(|| NotFoundError::holding(holding_id))?;

        Holding::try_from(row).map_err(Into::into)
    }

    fn find_by_symbol(&self, portfolio_id: &str, symbol: &str) -> Result<Option<Holding>> {
        let mut conn = get_connection(&self.pool)?;

        let row = holdings::table
            .filter(holdings::portfolio_id.eq(portfolio_id))
            .filter(holdings::symbol.eq(normalize_symbol(symbol)))
            .select(HoldingDB::as_select())
            .first::<HoldingDB>(&mut conn)
            .optional()
            .into_core()?;

        row.map(|r| Holding::try_from(r).map_err(Into::into))
            .transpose()
    }

    fn list_by_portfolio(&self, portfolio_id: &str) -> Result<Vec<Holding>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = holdings::table
            .filter(holdings::portfolio_id.eq(portfolio_id))
            .select(HoldingDB::as_select())
            .order((holdings::symbol.asc(), holdings::id.asc()))
            .load::<HoldingDB>(&mut conn)
            .into_core()?;

        into_holdings(rows)
    }

    fn list_by_portfolios(&self, portfolio_ids: &[String]) -> Result<Vec<Holding>> {
        let mut conn = get_connection(&self.pool)?;

        let mut rows = Vec::new();
        for chunk in chunk_for_sqlite(portfolio_ids) {
            let batch = holdings::table
                .filter(holdings::portfolio_id.eq_any(chunk))
                .select(HoldingDB::as_select())
                .load::<HoldingDB>(&mut conn)
                .into_core()?;
            rows.extend(batch);
        }
        rows.sort_by(|a, b| {
            (&a.portfolio_id, &a.symbol, &a.id).cmp(&(&b.portfolio_id, &b.symbol, &b.id))
        });

        into_holdings(rows)
    }

    async fn create_holding(&self, new_holding: NewHolding) -> Result<Holding> {
        let holding = new_holding.into_holding(Utc::now());

        self.writer
            .exec(move |conn| {
                diesel::insert_into(holdings::table)
                    .values(&HoldingDB::from(&holding))
                    .execute(conn)
                    .into_core()?;
                Ok(holding)
            })
            .await
    }

    async fn save(&self, holding: &Holding, transactions: &[Transaction]) -> Result<Holding> {
        let saved = holding.clone();
        let holding_row = HoldingDB::from(holding);
        let rows: Vec<TransactionDB> = transactions.iter().map(TransactionDB::from).collect();

        self.writer
            .exec(move |conn| {
                write_holding(conn, &holding_row, &rows)?;
                Ok(saved)
            })
            .await
    }

    async fn remove_transaction(
        &self,
        holding: &Holding,
        transaction_id: &str,
        touched: &[Transaction],
    ) -> Result<Holding> {
        let saved = holding.clone();
        let holding_row = HoldingDB::from(holding);
        let rows: Vec<TransactionDB> = touched.iter().map(TransactionDB::from).collect();
        let transaction_id = transaction_id.to_string();

        self.writer
            .exec(move |conn| {
                let deleted = diesel::delete(
                    transactions::table
                        .filter(transactions::id.eq(&transaction_id))
                        .filter(transactions::holding_id.eq(&holding_row.id)),
                )
                .execute(conn)
                .into_core()?;
                if deleted == 0 {
                    return Err(NotFoundError::transaction(transaction_id).into());
                }

                write_holding(conn, &holding_row, &rows)?;
                Ok(saved)
            })
            .await
    }

    async fn delete_holding(&self, holding_id: &str) -> Result<usize> {
        let holding_id = holding_id.to_string();

        self.writer
            .exec(move |conn| {
                diesel::delete(transactions::table.filter(transactions::holding_id.eq(&holding_id)))
                    .execute(conn)
                    .into_core()?;
                let deleted = diesel::delete(holdings::table.find(&holding_id))
                    .execute(conn)
                    .into_core()?;
                if deleted == 0 {
                    return Err(NotFoundError::holding(holding_id).into());
                }
                Ok(deleted)
            })
            .await
    }
}
