use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod progress;

use sitesync::config::{Config, LoggingConfig, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "sitesync")]
#[command(about = "Export and import full site snapshots between installations")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Shared secret naming the snapshot (overrides the config file)
    #[arg(long, env = "SITESYNC_SECRET", global = true, hide_env_values = true)]
    secret: Option<String>,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export content repository, database and assets to the publish directory
    Export,

    /// Import contents exported with `sitesync export` from the remote host
    Import {
        /// The live system's URI
        host: String,

        /// Skip the download and extraction of assets
        #[arg(long)]
        skip_assets: bool,
    },
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| logging.level.clone()),
    );
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    if let Some(secret) = cli.secret {
        config.secret = Some(secret);
    }

    init_logging(&config.logging);
    config.validate().context("Invalid configuration")?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping after the current step");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Export => {
            commands::run_export(&config, cli.no_progress, cancel).await?;
        }
        Commands::Import { host, skip_assets } => {
            commands::run_import(&config, &host, skip_assets, cli.no_progress, cancel).await?;
        }
    }

    Ok(())
}
