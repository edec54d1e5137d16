use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::ai::{AiConfig, AiError, AiMessage, AiProvider};

pub const DEFAULT_GROK_URL: &str = "https://x.ai/api/grok";

/// Prompt-in, text-out endpoint. Only the last user message is sent; the
/// model field of `AiConfig` is ignored.
pub struct GrokClient {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl GrokClient {
    pub fn new(url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.unwrap_or_else(|| DEFAULT_GROK_URL.to_string()),
            api_key,
        }
    }
}

/// The endpoint answers with `text`, `response`, or a bare string.
pub fn reply_text(body: &Value) -> Option<String> {
    body["text"]
        .as_str()
        .or_else(|| body["response"].as_str())
        .or_else(|| body.as_str())
        .map(str::to_string)
}

#[async_trait]
impl AiProvider for GrokClient {
    async fn chat_complete(&self, messages: &[AiMessage], _config: &AiConfig) -> Result<String, AiError> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let mut request = self.client.post(&self.url).json(&json!({ "prompt": prompt }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| AiError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                provider: "Grok",
                status,
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AiError::Decode(e.to_string()))?;
        reply_text(&body).ok_or_else(|| AiError::Decode(format!("no text in Grok reply: {body}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_text_accepts_each_shape() {
        assert_eq!(reply_text(&json!({ "text": "a" })).as_deref(), Some("a"));
        assert_eq!(reply_text(&json!({ "response": "b" })).as_deref(), Some("b"));
        assert_eq!(reply_text(&json!("c")).as_deref(), Some("c"));
        assert_eq!(reply_text(&json!({ "other": 1 })), None);
    }
}
