mod cli;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{cmd_check_config, cmd_serve, CheckConfigArgs, ServeArgs};
use unauth_guard::{resolve_config, BlockerOverrides};

/// unauth-guard - block clients that keep failing authorization
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Blocker settings file (JSON or YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,

    #[command(flatten)]
    overrides: BlockerOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the demo API behind the gate
    Serve(ServeArgs),

    /// Validate settings and print the effective configuration
    CheckConfig(CheckConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!("Starting unauth-guard v{}", env!("CARGO_PKG_VERSION"));

    let result = match resolve_config(cli.config.as_deref(), &cli.overrides) {
        Ok(config) => match cli.command {
            Commands::Serve(args) => cmd_serve(args, config).await,
            Commands::CheckConfig(args) => cmd_check_config(args, &config),
        },
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Command failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
