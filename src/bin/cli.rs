//! Fund updater CLI
//!
//! Local execution entry point: one-off runs, a daily scheduler, and
//! configuration checks.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fund_updater::{
    error::Result,
    models::Config,
    pipeline,
    storage::{JsonBackup, ResultSink, SqliteSink},
};

/// Fund updater - keeps the active mutual fund list current
#[derive(Parser, Debug)]
#[command(
    name = "fund-updater",
    version,
    about = "Filters the mutual fund catalog down to actively reporting schemes"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Database connection string (overrides database.url)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Backup file path (overrides output.backup_file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single update now
    Run,

    /// Run an update every day at a fixed local time
    Schedule {
        /// Time of day in HH:MM (24-hour)
        #[arg(long, default_value = "09:30")]
        at: String,
    },

    /// Validate configuration
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Apply command-line overrides on top of the file configuration.
fn resolve_config(cli: &Cli) -> Config {
    let mut config = Config::load_or_default(&cli.config);

    if let Some(url) = &cli.database_url {
        config.database.url = Some(url.clone());
    }
    if let Some(output) = &cli.output {
        config.output.backup_file = output.display().to_string();
    }

    config
}

fn build_sinks(config: &Config) -> Result<Vec<Box<dyn ResultSink>>> {
    Ok(vec![
        Box::new(SqliteSink::from_config(&config.database)?),
        Box::new(JsonBackup::new(&config.output.backup_file)),
    ])
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = resolve_config(&cli);

    match &cli.command {
        Command::Run => {
            config.validate()?;
            let sinks = build_sinks(&config)?;
            let report = pipeline::run_update(&config, &sinks).await?;

            if !report.all_sinks_ok() {
                log::warn!("Update finished, but at least one sink failed");
            }
        }

        Command::Schedule { at } => {
            let at = pipeline::parse_daily_time(at)?;
            config.validate()?;
            let sinks = build_sinks(&config)?;
            pipeline::run_daily(&config, at, &sinks).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ API: {}", config.api.base_url()?);
            log::info!(
                "✓ Fetch: {} concurrent, {} attempts, {} day window",
                config.fetch.concurrency,
                config.fetch.retry_count,
                config.filter.threshold_days
            );
            log::info!(
                "✓ Sinks: {}.{} and {}",
                config.database.name,
                config.database.collection,
                config.output.backup_file
            );
        }
    }

    log::info!("Done!");

    Ok(())
}
