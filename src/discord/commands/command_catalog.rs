// Discord commands module.
// Each feature gets its own command file.

pub mod imagine;

pub mod presence;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared command state. The relay commands are stateless today.
#[derive(Debug, Default)]
pub struct Data;
