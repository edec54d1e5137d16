// Chat replies with a primary model, a fallback model and optional translation.

use super::ai_service::{AiProvider, Translator};
use super::models::{AiConfig, AiError, AiMessage};

pub const FALLBACK_MODEL: &str = "gpt-3.5-turbo";

pub struct ChatRouter {
    primary: Box<dyn AiProvider>,
    fallback: Box<dyn AiProvider>,
    translator: Option<Box<dyn Translator>>,
}

impl ChatRouter {
    pub fn new(
        primary: Box<dyn AiProvider>,
        fallback: Box<dyn AiProvider>,
        translator: Option<Box<dyn Translator>>,
    ) -> Self {
        Self {
            primary,
            fallback,
            translator,
        }
    }

    /// Answers `prompt`, translated into `lang` when it is set and not `en`.
    pub async fn reply(&self, prompt: &str, lang: Option<&str>) -> Result<String, AiError> {
        if prompt.trim().is_empty() {
            return Err(AiError::InvalidInput("prompt required".to_string()));
        }
        let messages = [AiMessage::user(prompt)];
        let config = AiConfig::new(FALLBACK_MODEL);

        let text = match self.primary.chat_complete(&messages, &config).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Primary chat model failed, falling back");
                self.fallback.chat_complete(&messages, &config).await?
            }
        };

        Ok(self.translate(text, lang).await)
    }

    async fn translate(&self, text: String, lang: Option<&str>) -> String {
        let (Some(target), Some(translator)) = (lang, self.translator.as_ref()) else {
            return text;
        };
        if target.is_empty() || target == "en" {
            return text;
        }
        match translator.translate(&text, target).await {
            Ok(translated) if !translated.is_empty() => translated,
            Ok(_) => text,
            Err(e) => {
                tracing::error!(target, error = %e, "Translation error");
                text
            }
        }
    }
}
