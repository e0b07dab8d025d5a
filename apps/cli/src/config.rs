use std::str::FromStr;

use anyhow::Context;
use costfolio_core::{CostBasisPolicy, EngineConfig};
use rust_decimal::Decimal;

pub struct Config {
    pub db_path: String,
    pub engine: EngineConfig,
}

impl Config {
    /// Loads `.env` (if present) and reads the `COSTFOLIO_*` variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let db_path = lookup("COSTFOLIO_DB_PATH").unwrap_or_else(|| "./db/costfolio.db".into());

        let mut engine = EngineConfig::default();
        if let Some(policy) = lookup("COSTFOLIO_COST_BASIS_POLICY") {
            engine.cost_basis_policy = CostBasisPolicy::from_str(&policy)?;
        }
        if let Some(strict) = lookup("COSTFOLIO_STRICT_TOTAL_AMOUNT") {
            engine.validation.strict_total_amount = parse_flag(&strict)
                .with_context(|| "Invalid COSTFOLIO_STRICT_TOTAL_AMOUNT")?;
        }
        if let Some(tolerance) = lookup("COSTFOLIO_TOTAL_AMOUNT_TOLERANCE") {
            engine.validation.total_amount_tolerance = Decimal::from_str(tolerance.trim())
                .with_context(|| format!("Invalid COSTFOLIO_TOTAL_AMOUNT_TOLERANCE '{}'", tolerance))?;
        }
        if let Some(concurrency) = lookup("COSTFOLIO_RECOMPUTE_CONCURRENCY") {
            engine.recompute_concurrency = concurrency
                .trim()
                .parse()
                .with_context(|| format!("Invalid COSTFOLIO_RECOMPUTE_CONCURRENCY '{}'", concurrency))?;
        }
        if let Some(cleanup) = lookup("COSTFOLIO_DELETE_EMPTY_HOLDINGS") {
            engine.delete_empty_holdings = parse_flag(&cleanup)
                .with_context(|| "Invalid COSTFOLIO_DELETE_EMPTY_HOLDINGS")?;
        }
        engine.validate()?;

        Ok(Self { db_path, engine })
    }
}

fn parse_flag(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}
