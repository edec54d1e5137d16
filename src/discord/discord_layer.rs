// Discord layer - commands and the bot runner.

#[path = "commands/command_catalog.rs"]
pub mod commands;

pub mod bot_runner;

pub use bot_runner::run_bot;
