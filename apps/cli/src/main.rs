mod commands;
mod config;
mod main_lib;

use std::process::ExitCode;

use commands::{Command, USAGE};
use config::Config;
use main_lib::{build_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return Ok(ExitCode::from(2));
        }
    };
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::from_env()?;
    init_tracing();
    let state = build_state(&config).await?;

    if commands::run(command, &state).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!("Some holdings could not be recomputed");
        Ok(ExitCode::FAILURE)
    }
}
