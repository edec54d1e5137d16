// Bot presence. Only touches Discord SDK types.

use poise::serenity_prelude as serenity;

pub const DEFAULT_ACTIVITY: &str = "/imagine prompts";

/// Called once the bot is ready so the default presence is set in one place.
pub fn on_ready(ctx: &serenity::Context) {
    let activity = serenity::ActivityData::listening(DEFAULT_ACTIVITY);
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}
