use std::fmt::Write as _;

use anyhow::{anyhow, bail};
use costfolio_core::constants::{DISPLAY_DECIMAL_PRECISION, QUANTITY_DISPLAY_PRECISION};
use costfolio_core::recompute::{
    BatchRecomputeResult, HoldingRecomputeFailure, HoldingRecomputeOutcome, RecomputeServiceTrait,
};

use crate::main_lib::AppState;

pub const USAGE: &str = "\
Usage: costfolio <command>

Commands:
  migrate                                          Create the database and apply migrations
  recompute-holding <holding_id> --owner <owner>   Recompute one holding
  recompute-portfolio <portfolio_id> --owner <owner>
                                                   Recompute every holding in a portfolio
  recompute-all <owner>                            Recompute every holding the owner has
  help                                             Show this message

Configuration is read from COSTFOLIO_* environment variables (and .env).";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Migrate,
    RecomputeHolding { holding_id: String, owner_id: String },
    RecomputePortfolio { portfolio_id: String, owner_id: String },
    RecomputeAll { owner_id: String },
    Help,
}

impl Command {
    /// Parses the arguments following the program name.
    pub fn parse<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        let Some(name) = args.next() else {
            return Ok(Command::Help);
        };
        let rest: Vec<String> = args.collect();

        match name.as_str() {
            "migrate" => {
                expect_no_more(&rest)?;
                Ok(Command::Migrate)
            }
            "recompute-holding" => {
                let (holding_id, owner_id) = target_with_owner(&name, &rest)?;
                Ok(Command::RecomputeHolding {
                    holding_id,
                    owner_id,
                })
            }
            "recompute-portfolio" => {
                let (portfolio_id, owner_id) = target_with_owner(&name, &rest)?;
                Ok(Command::RecomputePortfolio {
                    portfolio_id,
                    owner_id,
                })
            }
            "recompute-all" => match rest.as_slice() {
                [owner_id] => Ok(Command::RecomputeAll {
                    owner_id: owner_id.clone(),
                }),
                _ => bail!("recompute-all expects exactly one <owner> argument"),
            },
            "help" | "-h" | "--help" => Ok(Command::Help),
            other => bail!("Unknown command '{}'", other),
        }
    }
}

fn expect_no_more(rest: &[String]) -> anyhow::Result<()> {
    match rest.first() {
        Some(extra) => bail!("Unexpected argument '{}'", extra),
        None => Ok(()),
    }
}

/// Accepts `<id> --owner <owner>` with the flag on either side of the id.
fn target_with_owner(command: &str, rest: &[String]) -> anyhow::Result<(String, String)> {
    let mut target = None;
    let mut owner = None;
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        if arg == "--owner" {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("--owner needs a value"))?;
            owner = Some(value.clone());
        } else if let Some(value) = arg.strip_prefix("--owner=") {
            owner = Some(value.to_string());
        } else if target.is_none() {
            target = Some(arg.clone());
        } else {
            bail!("Unexpected argument '{}'", arg);
        }
    }

    match (target, owner) {
        (Some(target), Some(owner)) if !owner.is_empty() => Ok((target, owner)),
        (None, _) => bail!("{} expects an id argument", command),
        _ => bail!("{} requires --owner <owner>", command),
    }
}

/// Runs a recompute command, printing one line per holding. Returns false when
/// any holding failed.
pub async fn run(command: Command, state: &AppState) -> anyhow::Result<bool> {
    let service = state.recompute_service.as_ref();
    match command {
        Command::Migrate => {
            println!("Database ready at {}", state.db_path);
            Ok(true)
        }
        Command::RecomputeHolding {
            holding_id,
            owner_id,
        } => {
            let outcome = service.recompute_holding(&owner_id, &holding_id).await?;
            println!("{}", format_outcome(&outcome));
            Ok(true)
        }
        Command::RecomputePortfolio {
            portfolio_id,
            owner_id,
        } => {
            let result = service.recompute_portfolio(&owner_id, &portfolio_id).await?;
            print_batch(&result);
            Ok(!result.has_failures())
        }
        Command::RecomputeAll { owner_id } => {
            let result = service.recompute_all(&owner_id).await?;
            print_batch(&result);
            Ok(!result.has_failures())
        }
        Command::Help => {
            println!("{}", USAGE);
            Ok(true)
        }
    }
}

fn print_batch(result: &BatchRecomputeResult) {
    for outcome in &result.recomputed {
        println!("{}", format_outcome(outcome));
    }
    for failure in &result.failures {
        println!("{}", format_failure(failure));
    }
    println!(
        "{} recomputed, {} failed, {} with anomalies",
        result.recomputed_count(),
        result.failures.len(),
        result.anomalies().len()
    );
}

pub fn format_outcome(outcome: &HoldingRecomputeOutcome) -> String {
    let holding = &outcome.holding;
    let mut line = format!(
        "ok     {:<10} {}  quantity={}  avg_cost={}  annotated={}",
        holding.symbol,
        holding.id,
        holding
            .current_quantity
            .round_dp(QUANTITY_DISPLAY_PRECISION)
            .normalize(),
        holding
            .average_cost_per_share
            .round_dp(DISPLAY_DECIMAL_PRECISION),
        outcome.transactions_annotated
    );
    if let Some(anomaly) = &outcome.anomaly {
        let _ = write!(line, "  ANOMALY computed_quantity={}", anomaly.computed_quantity);
    }
    line
}

pub fn format_failure(failure: &HoldingRecomputeFailure) -> String {
    format!(
        "failed {:<10} {}  {}",
        failure.symbol, failure.holding_id, failure.error
    )
}
