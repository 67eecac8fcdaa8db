//! HeritageBot - Conversational Assistant for Cultural Heritage Datasets
//!
//! Runs the chat gateway, or converts dataset files offline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use heritagebot::{
    config::HeritageBotConfig,
    convert::{self, ConvertOptions, FieldFilter},
    dataset::DataFormat,
    gateway::GatewayBuilder,
    query::SortOrder,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "heritagebot")]
#[command(author = "HeritageBot Team")]
#[command(version)]
#[command(about = "Conversational assistant for cultural heritage datasets")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "HERITAGEBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot on the configured channels
    Run,

    /// Convert a dataset file, optionally filtering and sorting it
    Convert {
        /// Input file (.csv or .json)
        input: PathBuf,

        /// Output format
        #[arg(long)]
        to: DataFormat,

        /// Sort by object name (asc or desc)
        #[arg(long)]
        sort: Option<SortOrder>,

        /// Keep only records where FIELD equals VALUE (repeatable)
        #[arg(long = "filter", value_name = "FIELD=VALUE")]
        filters: Vec<FieldFilter>,

        /// Output path (defaults to the input name with the new extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("heritagebot={}", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Run => {
            run_gateway(config).await?;
        }
        Commands::Convert {
            input,
            to,
            sort,
            filters,
            output,
        } => {
            let options = ConvertOptions { to, sort, filters };
            let summary = convert::convert_file(&input, output.as_deref(), &options)?;
            println!(
                "Wrote {} record(s) to {}",
                summary.records,
                summary.output.display()
            );
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

/// Explicit path first, then the default location, then built-in defaults
fn load_config(path: Option<PathBuf>) -> Result<HeritageBotConfig> {
    if let Some(path) = path {
        return HeritageBotConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.display()));
    }

    match HeritageBotConfig::default_path() {
        Some(path) if path.exists() => {
            tracing::debug!("Using configuration at {}", path.display());
            HeritageBotConfig::from_file(&path)
                .with_context(|| format!("loading {}", path.display()))
        }
        _ => Ok(HeritageBotConfig::default()),
    }
}

async fn run_gateway(config: HeritageBotConfig) -> Result<()> {
    if config.channels.telegram.is_none() {
        tracing::warn!("No channels configured; add a [channels.telegram] section");
    }

    let gateway = GatewayBuilder::new().config(config).build();

    gateway.start().await?;

    tracing::info!("HeritageBot is running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down...");
    gateway.stop().await?;

    Ok(())
}

fn show_config(config: Option<&HeritageBotConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    println!("{}", config.to_toml()?);
    Ok(())
}
