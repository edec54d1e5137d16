// `/imagine` and `!imagine`: echo a cleaned prompt back into the channel so an
// image bot listening there can pick it up.
//
// Same pattern as every other command: pull the text out of Discord, hand it
// to core, post whatever comes back.

use super::{Context, Error};
use crate::core::prompts::{imagine_command, PromptError};

pub const EMPTY_PROMPT_REPLY: &str = "Please provide a prompt, e.g. `!imagine a neon city at dusk`.";

pub fn imagine_reply(prompt: &str) -> String {
    match imagine_command(prompt) {
        Ok(line) => line,
        Err(PromptError::Empty) => EMPTY_PROMPT_REPLY.to_string(),
    }
}

/// Relay an image prompt to this channel.
#[poise::command(slash_command, prefix_command)]
pub async fn imagine(
    ctx: Context<'_>,
    #[rest]
    #[description = "What should the image show?"]
    prompt: String,
) -> Result<(), Error> {
    let reply = imagine_reply(&prompt);
    tracing::info!(
        user = %ctx.author().name,
        channel = ctx.channel_id().get(),
        chars = prompt.chars().count(),
        "Relaying imagine prompt"
    );
    ctx.say(reply).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_is_wrapped_in_imagine_syntax() {
        assert_eq!(imagine_reply(" a  red fox "), "/imagine prompt: a red fox");
    }

    #[test]
    fn empty_prompt_gets_usage_hint() {
        assert_eq!(imagine_reply("   "), EMPTY_PROMPT_REPLY);
    }
}
