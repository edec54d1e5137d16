use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("{provider} API error: {status} - {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("AI request failed: {0}")]
    Http(String),
    #[error("Unexpected AI response: {0}")]
    Decode(String),
    #[error("{0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiMessage {
    pub role: String,
    pub content: String,
}

impl AiMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl AiConfig {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Input for `POST /api/v1/generate/ad_copy`.
#[derive(Debug, Clone, Deserialize)]
pub struct AdCopyRequest {
    pub product_name: String,
    pub product_description: String,
    #[serde(default)]
    pub target_audience_keywords: Option<Vec<String>>,
    pub marketing_goal: String,
    #[serde(default)]
    pub ad_tone: Option<String>,
    #[serde(default = "default_variations")]
    pub num_variations: u8,
}

fn default_variations() -> u8 {
    2
}

pub const MAX_DESCRIPTION_CHARS: usize = 500;

impl AdCopyRequest {
    pub fn validate(&self) -> Result<(), AiError> {
        if self.product_description.chars().count() > MAX_DESCRIPTION_CHARS {
            return Err(AiError::InvalidInput(format!(
                "product_description must be at most {MAX_DESCRIPTION_CHARS} characters"
            )));
        }
        if !(1..=5).contains(&self.num_variations) {
            return Err(AiError::InvalidInput(
                "num_variations must be between 1 and 5".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdCopy {
    pub headline: String,
    pub body: String,
    pub cta: String,
}

/// Input for `POST /api/v1/generate/image`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub aspect_ratio: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub branding_elements: Option<Vec<String>>,
    #[serde(default = "default_quality")]
    pub quality: String,
}

fn default_quality() -> String {
    "standard".to_string()
}

impl ImageRequest {
    pub fn validate(&self) -> Result<(), AiError> {
        if dalle_size(&self.aspect_ratio).is_none() {
            return Err(AiError::InvalidInput(format!(
                "aspect_ratio must be one of 1:1, 16:9, 9:16, 4:3, 3:2 (got {})",
                self.aspect_ratio
            )));
        }
        if self.quality != "standard" && self.quality != "hd" {
            return Err(AiError::InvalidInput(
                "quality must be standard or hd".to_string(),
            ));
        }
        Ok(())
    }
}

/// DALL-E 3 only renders three sizes, so the landscape ratios share one.
pub fn dalle_size(aspect_ratio: &str) -> Option<&'static str> {
    match aspect_ratio {
        "1:1" => Some("1024x1024"),
        "16:9" | "4:3" | "3:2" => Some("1792x1024"),
        "9:16" => Some("1024x1792"),
        _ => None,
    }
}
