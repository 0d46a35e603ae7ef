mod cli;
mod commands;
mod output;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if cli.log_json {
        fmt.json().init();
    } else {
        fmt.init();
    }

    let access = commands::Access::from_cli(&cli);

    match cli.command {
        Command::Run { config, only, max_parallel, keep_baseline, output } => {
            commands::run(access, config, only, max_parallel, keep_baseline, output).await
        }
        Command::Compliance { resource_id, assignment, no_trigger, max_attempts, interval_secs } => {
            commands::compliance(access, resource_id, assignment, no_trigger, max_attempts, interval_secs)
                .await
        }
        Command::Cases { config, output } => commands::cases(config, output),
    }
}
