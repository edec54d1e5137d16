use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::core::ai::{AiConfig, AiError, AiMessage, AiProvider, ImageGenerator};
use crate::infra::retry::RetryPolicy;

const OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const IMAGE_MODEL: &str = "dall-e-3";

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    image_retry: RetryPolicy,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: OPENAI_BASE.to_string(),
            image_retry: RetryPolicy::default(),
        }
    }

    pub fn with_image_retry(mut self, policy: RetryPolicy) -> Self {
        self.image_retry = policy;
        self
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<Value, AiError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| AiError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                provider: "OpenAI",
                status,
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AiError::Decode(e.to_string()))
    }
}

pub fn chat_payload(messages: &[AiMessage], config: &AiConfig) -> Value {
    let mut payload = json!({
        "model": config.model,
        "messages": messages,
    });
    if let Some(temperature) = config.temperature {
        payload["temperature"] = json!(temperature);
    }
    if let Some(max_tokens) = config.max_tokens {
        payload["max_tokens"] = json!(max_tokens);
    }
    payload
}

#[async_trait]
impl AiProvider for OpenAiClient {
    async fn chat_complete(&self, messages: &[AiMessage], config: &AiConfig) -> Result<String, AiError> {
        let response = self
            .post("/chat/completions", &chat_payload(messages, config))
            .await?;

        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AiError::Decode("missing choices[0].message.content".to_string()))
    }
}

#[async_trait]
impl ImageGenerator for OpenAiClient {
    async fn generate_image(&self, prompt: &str, size: &str, quality: &str) -> Result<String, AiError> {
        let payload = json!({
            "model": IMAGE_MODEL,
            "prompt": prompt,
            "size": size,
            "quality": quality,
            "n": 1,
        });
        let response = self
            .image_retry
            .run("dall-e", || self.post("/images/generations", &payload))
            .await?;
        response["data"][0]["url"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AiError::Decode("missing data[0].url".to_string()))
    }
}
