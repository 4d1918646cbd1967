//! AgroMind CLI — the main entry point.
//!
//! Commands:
//! - `serve`    — Start the HTTP API server
//! - `status`   — Show the effective configuration
//! - `doctor`   — Check configuration, store and upstream keys
//! - `onboard`  — Write a default `agromind.toml`

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "agromind",
    about = "AgroMind — farmer advisory backend",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (defaults to ./agromind.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show the effective configuration
    Status,

    /// Diagnose configuration and store health
    Doctor,

    /// Write a default config file
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Status => commands::status::run(config_path).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
        Commands::Onboard => commands::onboard::run(config_path).await?,
    }

    Ok(())
}
