// =============================================================================
// GEMINI CLIENT
// =============================================================================
//
// `AiProvider` over Google's generateContent endpoint. Used for ad copy.
//
// - The API key goes in the `?key=` query parameter, not a bearer header.
// - System messages travel separately as `systemInstruction`.
// - The reply text is at `candidates[0].content.parts[*].text`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::ai::{AiConfig, AiError, AiMessage, AiProvider};

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    /// "user" or "model"
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    fn text_content(role: &str, text: &str) -> Content {
        Content {
            role: role.to_string(),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }

    fn build_request(messages: &[AiMessage], config: &AiConfig) -> GenerateContentRequest {
        let system_instruction = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| Self::text_content("user", &m.content));

        let contents = messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                // Gemini says "model" where everyone else says "assistant".
                let role = if m.role == "assistant" { "model" } else { m.role.as_str() };
                Self::text_content(role, &m.content)
            })
            .collect();

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_tokens,
            },
        }
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn chat_complete(&self, messages: &[AiMessage], config: &AiConfig) -> Result<String, AiError> {
        let url = format!("{GEMINI_BASE}/{}:generateContent", config.model);
        let request = Self::build_request(messages, config);

        tracing::debug!(model = %config.model, messages = messages.len(), "Gemini request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| AiError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let body = serde_json::from_str::<GeminiErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(AiError::Api {
                provider: "Gemini",
                status,
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AiError::Decode(e.to_string()))?;

        let candidate = parsed
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .ok_or_else(|| {
                AiError::Decode("no candidates; the prompt may have been blocked".to_string())
            })?;

        let text: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_message_becomes_instruction() {
        let messages = [
            AiMessage::system("be brief"),
            AiMessage::user("hi"),
            AiMessage {
                role: "assistant".to_string(),
                content: "hello".to_string(),
            },
        ];
        let request = GeminiClient::build_request(&messages, &AiConfig::new("gemini-pro").temperature(0.7));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(json["contents"].as_array().unwrap().len(), 2);
        assert_eq!(json["contents"][1]["role"], "model");
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }
}
