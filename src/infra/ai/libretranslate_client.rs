use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::core::ai::{AiError, Translator};

pub const DEFAULT_LIBRETRANSLATE_URL: &str = "https://libretranslate.de/translate";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: Option<String>,
}

/// English-source translation through a LibreTranslate instance.
pub struct LibreTranslateClient {
    client: Client,
    url: String,
}

impl LibreTranslateClient {
    pub fn new(url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.unwrap_or_else(|| DEFAULT_LIBRETRANSLATE_URL.to_string()),
        }
    }
}

#[async_trait]
impl Translator for LibreTranslateClient {
    async fn translate(&self, text: &str, target: &str) -> Result<String, AiError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "q": text, "source": "en", "target": target, "format": "text" }))
            .send()
            .await
            .map_err(|e| AiError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                provider: "LibreTranslate",
                status,
                body,
            });
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| AiError::Decode(e.to_string()))?;
        // An empty answer keeps the original text.
        Ok(parsed.translated_text.unwrap_or_else(|| text.to_string()))
    }
}
