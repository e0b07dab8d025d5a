use std::sync::Arc;

use costfolio_core::events::LogDomainEventSink;
use costfolio_core::recompute::{HoldingLocks, RecomputeService};
use costfolio_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, HoldingRepository, PortfolioRepository,
    TransactionRepository,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub db_path: String,
    pub recompute_service: Arc<RecomputeService>,
}

/// Installs the global subscriber on stderr. Records from the `log` facade
/// used by the library crates are forwarded into it.
pub fn init_tracing() {
    let log_format = std::env::var("COSTFOLIO_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

/// Opens the database, applies pending migrations and wires the services.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let db_path = init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = create_pool(&db_path)?;
    run_migrations(&pool)?;
    let writer = spawn_writer((*pool).clone());

    let holding_repository = Arc::new(HoldingRepository::new(pool.clone(), writer.clone()));
    let transaction_repository = Arc::new(TransactionRepository::new(pool.clone()));
    let portfolio_repository = Arc::new(PortfolioRepository::new(pool, writer));

    let recompute_service = Arc::new(RecomputeService::new(
        holding_repository,
        transaction_repository,
        portfolio_repository,
        HoldingLocks::new(),
        config.engine.clone(),
        Arc::new(LogDomainEventSink),
    ));

    Ok(AppState {
        db_path,
        recompute_service,
    })
}
