mod agent;
mod cli;
mod commands;
mod registry;

use anyhow::{Context, Result};
use clap::Parser;

use finagent_core::config::{load_dotenv, Config};

use crate::cli::{CliArgs, Command};
use crate::commands::EvalArgs;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let config = Config::from_env();
    config.validate().context("invalid configuration")?;
    config.log_summary();

    match args.command {
        Command::Eval {
            tasks,
            output,
            mode,
            timeout_secs,
            fail_fast,
            log,
        } => {
            commands::run_eval(
                &config,
                EvalArgs {
                    tasks,
                    output,
                    mode,
                    timeout_secs,
                    fail_fast,
                    log,
                    system_prompt: args.system_prompt,
                    max_iterations: args.max_iterations,
                },
            )
            .await
        }
        Command::Tool { name, input } => commands::run_tool(&config, &name, &input).await,
        Command::Tools => commands::list_tools(&config).await,
        Command::LogStats { log } => commands::log_stats(&config, log.as_deref()),
    }
}
