// CLI layer - argument parsing and the runners that wire core services to
// their infra clients for a single invocation.

pub mod commands;
pub mod pipelines;
pub mod serve;

pub use commands::{Cli, Command};

use crate::core::config::EnvSource;

pub async fn dispatch(cli: Cli, env: &dyn EnvSource) -> anyhow::Result<()> {
    match cli.command {
        Command::Notion(command) => pipelines::run_notion(command, env).await,
        Command::Project(command) => pipelines::run_project(command, env).await,
        Command::Discord(command) => pipelines::run_discord(command, env).await,
        Command::Reddit(command) => pipelines::run_reddit(command, env).await,
        Command::Drive(command) => pipelines::run_drive(command, env).await,
        Command::S3(command) => pipelines::run_s3(command, env).await,
        Command::Shop(command) => pipelines::run_shop(command, env).await,
        Command::Totango(args) => pipelines::run_totango(args).await,
        Command::Serve { bind } => serve::run_serve(bind, env).await,
    }
}
