// Turning user text into an `/imagine` line that is safe to echo into a channel.

use thiserror::Error;

/// Leaves headroom under Discord's 2000 character message cap for the prefix.
pub const MAX_PROMPT_CHARS: usize = 1800;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Prompt is empty")]
    Empty,
}

/// Collapses whitespace, drops control characters, defuses mass mentions and
/// caps the length.
pub fn sanitize_prompt(raw: &str) -> Result<String, PromptError> {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    // A zero-width space after '@' stops Discord from resolving the mention.
    let defused = collapsed
        .replace("@everyone", "@\u{200B}everyone")
        .replace("@here", "@\u{200B}here");

    let capped: String = defused.chars().take(MAX_PROMPT_CHARS).collect();
    let trimmed = capped.trim().to_string();

    if trimmed.is_empty() {
        return Err(PromptError::Empty);
    }
    Ok(trimmed)
}

pub fn imagine_command(raw: &str) -> Result<String, PromptError> {
    Ok(format!("/imagine prompt: {}", sanitize_prompt(raw)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_newlines() {
        assert_eq!(
            sanitize_prompt("  a  cat\n\n in\tspace ").unwrap(),
            "a cat in space"
        );
    }

    #[test]
    fn mass_mentions_are_defused() {
        let out = sanitize_prompt("hi @everyone and @here").unwrap();
        assert!(!out.contains("@everyone"));
        assert!(!out.contains("@here"));
    }

    #[test]
    fn blank_prompt_is_rejected() {
        assert_eq!(sanitize_prompt(" \n\u{0007} "), Err(PromptError::Empty));
    }

    #[test]
    fn long_prompt_is_capped_on_char_boundary() {
        let out = sanitize_prompt(&"é".repeat(MAX_PROMPT_CHARS + 50)).unwrap();
        assert_eq!(out.chars().count(), MAX_PROMPT_CHARS);
    }

    #[test]
    fn imagine_command_prefixes_prompt() {
        assert_eq!(
            imagine_command("neon city").unwrap(),
            "/imagine prompt: neon city"
        );
    }
}
