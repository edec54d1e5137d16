// Entry point for the automation hub.
//
// **Architecture Overview:**
// - `core/` = Pipeline logic and the traits vendors sit behind
// - `infra/` = HTTP, SQLite, S3 and ffmpeg implementations of those traits
// - `discord/` = The `/imagine` bot (poise commands)
// - `api/` = The ad studio HTTP service (axum)
// - `cli/` = Subcommands, one composition root per pipeline
//
// This file only loads configuration, sets up logging and dispatches.

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "api/api_layer.rs"]
mod api;
#[path = "cli/cli_layer.rs"]
mod cli;
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::core::config::ProcessEnv;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = cli::dispatch(cli, &ProcessEnv).await {
        tracing::error!(error = %e, "Command failed");
        return Err(e);
    }
    Ok(())
}
