//! TokenAlert CLI
//!
//! Command-line interface for the WoW token price alert.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tokenalert::alerting::{AlertOrchestrator, NotificationRouter, TickOutcome};
use tokenalert::db;
use tokenalert::fetcher::{PriceFetcher, PriceSource};
use tokenalert::models::{format_grouped, NotificationEvent};
use tokenalert::Config;

/// TokenAlert - WoW token price notifications
#[derive(Parser)]
#[command(name = "tokenalert")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path (TOML, same keys as the environment)
    #[arg(short, long, global = true, env = "TOKENALERT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single poll-compare-notify tick
    Tick,

    /// Run ticks on the configured interval until interrupted
    Watch {
        /// Override the interval between ticks (e.g. "5m")
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<std::time::Duration>,

        /// Override the delay before the first tick (e.g. "15s")
        #[arg(long, value_parser = humantime::parse_duration)]
        offset: Option<std::time::Duration>,
    },

    /// Fetch and print the current price without notifying anyone
    Price,

    /// Inspect or overwrite the persisted price
    State {
        #[command(subcommand)]
        command: StateCommands,
    },

    /// Send a test notification to one address or phone number
    NotifyTest {
        /// Email address or phone number
        #[arg(long)]
        to: String,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// Print the stored price
    Show,

    /// Overwrite the stored price
    Set {
        /// New price value
        value: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config, cli.verbose);

    let result = match cli.command {
        Commands::Tick => run_tick(&config).await,
        Commands::Watch { interval, offset } => run_watch(&config, interval, offset).await,
        Commands::Price => run_price(&config).await,
        Commands::State { command } => run_state(&config, command).await,
        Commands::NotifyTest { to } => run_notify_test(&config, to).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_tick(config: &Config) -> anyhow::Result<()> {
    let orchestrator = AlertOrchestrator::from_config(config)?;

    match orchestrator.run_tick().await {
        TickOutcome::NoPrice => println!("No price available this tick"),
        TickOutcome::Unchanged { price } => println!("Unchanged at {}", format_grouped(price)),
        TickOutcome::Changed(report) => println!(
            "Price {} ({} notification(s), {} failed)",
            format_grouped(report.price),
            report.deliveries.len(),
            report.deliveries.iter().filter(|d| !d.success).count()
        ),
        TickOutcome::Failed(reason) => println!("Tick failed: {reason}"),
    }

    Ok(())
}

async fn run_watch(
    config: &Config,
    interval: Option<std::time::Duration>,
    offset: Option<std::time::Duration>,
) -> anyhow::Result<()> {
    let orchestrator = AlertOrchestrator::from_config(config)?;
    let every = interval.unwrap_or(config.schedule.interval);
    let offset = offset.unwrap_or(config.schedule.offset);
    anyhow::ensure!(!every.is_zero(), "interval must be greater than zero");

    orchestrator
        .watch(every, offset, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
        })
        .await;

    Ok(())
}

async fn run_price(config: &Config) -> anyhow::Result<()> {
    let fetcher = PriceFetcher::new(&config.source)?;
    let price = fetcher.fetch().await?;
    println!("{}", format_grouped(price));
    Ok(())
}

async fn run_state(config: &Config, command: StateCommands) -> anyhow::Result<()> {
    anyhow::ensure!(
        config.state.persist,
        "state persistence is disabled (PERSIST_TOKEN_PRICE=false)"
    );
    let store = db::open(&config.state)?;

    match command {
        StateCommands::Show => match store.load().await? {
            Some(price) => println!("{}", format_grouped(price)),
            None => println!("No price stored"),
        },
        StateCommands::Set { value } => {
            store.save(value).await?;
            println!("Stored {}", format_grouped(value));
        }
    }

    Ok(())
}

async fn run_notify_test(config: &Config, to: String) -> anyhow::Result<()> {
    let router = NotificationRouter::from_config(config)?;
    let event = NotificationEvent::new(
        to,
        "WoW Token: test notification",
        "This is a test message from tokenalert.",
    );

    let result = router.dispatch(&event).await;
    match result.error {
        None => {
            println!("Sent via {} to {}", result.channel, result.recipient);
            Ok(())
        }
        Some(error) => anyhow::bail!(
            "{} delivery to {} failed: {error}",
            result.channel,
            result.recipient
        ),
    }
}
