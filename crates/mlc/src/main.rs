//! Multi-Level Cache - Entry Point
//!
//! Operator CLI. Every command bootstraps a context from configuration,
//! runs, and shuts the context down again.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mlc stats [--namespace ns]` | Print hit rates and counters as JSON |
//! | `mlc health` | Print the health report as JSON |
//! | `mlc admin '<json>'` | Run a `clear_cache` / `invalidate_cache` command |
//! | `mlc serve` | Keep background work running until Ctrl-C |

use anyhow::Context;
use clap::{Parser, Subcommand};
use mlc_infrastructure::admin::{AdminCommand, dispatch};
use mlc_infrastructure::config::ConfigLoader;
use mlc_infrastructure::context::AppContext;
use mlc_infrastructure::logging::init_logging;
use std::path::PathBuf;
use std::time::Duration;

/// Interval between checks for outstanding delayed invalidations
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Command line interface for the multi-level cache
#[derive(Parser, Debug)]
#[command(name = "mlc")]
#[command(about = "Multi-level cache operator tool")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print cache statistics
    Stats {
        /// Restrict local figures to one namespace
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Print the health report
    Health,
    /// Run an admin command given as JSON
    Admin {
        /// e.g. `{"action": "clear_cache", "pattern": "price:*"}`
        command: String,
    },
    /// Run background pruning and draining until interrupted
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    let config = loader.load().context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let context = AppContext::bootstrap(config)
        .await
        .context("Failed to bootstrap cache context")?;

    let outcome = run(&context, cli.command).await;
    context.shutdown().await;
    outcome
}

async fn run(context: &AppContext, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Stats { namespace } => {
            print_json(&context.stats(namespace.as_deref()))?;
        }
        Command::Health => {
            let report = context.health().await;
            print_json(&report)?;
            if !report.status.is_operational() {
                anyhow::bail!("cache is not operational");
            }
        }
        Command::Admin { command } => {
            let command = AdminCommand::parse(&command).context("Invalid admin command")?;
            let outcome = dispatch(context, command).await?;
            wait_for_invalidations(context).await;
            print_json(&outcome)?;
        }
        Command::Serve => {
            context.start();
            tracing::info!("Serving, press Ctrl-C to stop");
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
        }
    }
    Ok(())
}

/// Drain the queue, flush batches and let delayed invalidations fire
async fn wait_for_invalidations(context: &AppContext) {
    context.engine().process_queue().await;
    context.engine().flush_batches().await;
    while context.scheduler().pending() > 0 {
        tokio::time::sleep(WAIT_POLL_INTERVAL).await;
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
