// Framework wiring for the relay bot: commands, prefix, intents.

use poise::serenity_prelude as serenity;

use super::commands::{imagine, presence, Data, Error};

pub const PREFIX: &str = "!";

pub fn framework_options() -> poise::FrameworkOptions<Data, Error> {
    poise::FrameworkOptions {
        commands: vec![imagine::imagine()],
        prefix_options: poise::PrefixFrameworkOptions {
            prefix: Some(PREFIX.to_string()),
            ..Default::default()
        },
        on_error: |error| {
            Box::pin(async move {
                if let poise::FrameworkError::Command { error, ctx, .. } = &error {
                    tracing::error!(command = %ctx.command().name, error = %error, "Command failed");
                } else if let Err(e) = poise::builtins::on_error(error).await {
                    tracing::error!("Error while handling error: {}", e);
                }
            })
        },
        ..Default::default()
    }
}

pub async fn run_bot(token: &str) -> anyhow::Result<()> {
    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required for `!imagine`
        | serenity::GatewayIntents::GUILDS;

    let framework = poise::Framework::builder()
        .options(framework_options())
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!(user = %ready.user.name, "Bot connected, commands registered");
                presence::on_ready(ctx);
                Ok(Data)
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await?;

    client.start().await?;
    Ok(())
}
