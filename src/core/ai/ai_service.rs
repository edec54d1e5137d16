use super::models::{AdCopy, AdCopyRequest, AiConfig, AiError, AiMessage, ImageRequest};
use async_trait::async_trait;
use std::sync::Arc;

pub const SUMMARY_MODEL: &str = "gpt-4o-mini";
pub const DESCRIPTION_MODEL: &str = "gpt-4";
pub const AD_COPY_MODEL: &str = "gemini-pro";

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Sends a chat completion request and returns the first choice's text.
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<String, AiError>;
}

// Lets services hold a provider picked at runtime.
#[async_trait]
impl AiProvider for Box<dyn AiProvider> {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<String, AiError> {
        (**self).chat_complete(messages, config).await
    }
}

#[async_trait]
impl<P: AiProvider + ?Sized> AiProvider for Arc<P> {
    async fn chat_complete(
        &self,
        messages: &[AiMessage],
        config: &AiConfig,
    ) -> Result<String, AiError> {
        (**self).chat_complete(messages, config).await
    }
}

/// Text-to-image generation. Returns a temporary URL of the rendered image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str, size: &str, quality: &str)
        -> Result<String, AiError>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: &str) -> Result<String, AiError>;
}

pub struct AiService<P: AiProvider> {
    provider: P,
}

impl<P: AiProvider> AiService<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Two or three sentence summary of a chat log.
    pub async fn summarize_chat(&self, text: &str) -> Result<String, AiError> {
        let messages = [
            AiMessage::system("You are a helpful assistant for summarizing chat logs."),
            AiMessage::user(format!(
                "Summarize the following chat content in 2-3 sentences:\n\n{text}"
            )),
        ];
        let config = AiConfig::new(SUMMARY_MODEL)
            .temperature(0.7)
            .max_tokens(150);
        let summary = self.provider.chat_complete(&messages, &config).await?;
        Ok(summary.trim().to_string())
    }

    pub async fn describe_product(&self, name: &str) -> Result<String, AiError> {
        let messages = [AiMessage::user(format!(
            "Write a concise, engaging product description for the item: {name}."
        ))];
        let description = self
            .provider
            .chat_complete(&messages, &AiConfig::new(DESCRIPTION_MODEL))
            .await?;
        Ok(description.trim().to_string())
    }

    pub async fn production_notes(&self, gpt_id: &str, model: &str) -> Result<String, AiError> {
        let messages = [
            AiMessage::system(format!("You are {gpt_id}")),
            AiMessage::user("Generate production notes for ClipOpera project."),
        ];
        self.provider
            .chat_complete(&messages, &AiConfig::new(model))
            .await
    }

    pub async fn generate_ad_copy(&self, request: &AdCopyRequest) -> Result<Vec<AdCopy>, AiError> {
        request.validate()?;
        let messages = [AiMessage::user(ad_copy_prompt(request))];
        let config = AiConfig::new(AD_COPY_MODEL).temperature(0.7);
        let raw = self.provider.chat_complete(&messages, &config).await?;
        parse_ad_copies(&raw)
    }
}

pub fn ad_copy_prompt(request: &AdCopyRequest) -> String {
    let mut parts = vec![
        "You are an expert social media advertiser.".to_string(),
        format!(
            "Generate {} unique ad copy variations for a product:",
            request.num_variations
        ),
        format!("Product Name: {}", request.product_name),
        format!("Product Description: {}", request.product_description),
    ];
    if let Some(keywords) = request
        .target_audience_keywords
        .as_ref()
        .filter(|k| !k.is_empty())
    {
        parts.push(format!("Target Audience Keywords: {}", keywords.join(", ")));
    }
    if !request.marketing_goal.is_empty() {
        parts.push(format!("Marketing Goal: {}", request.marketing_goal));
    }
    if let Some(tone) = request.ad_tone.as_ref().filter(|t| !t.is_empty()) {
        parts.push(format!("Ad Tone: {tone}"));
    }
    parts.push(
        "\nFor each variation, provide a concise headline (under 10 words), \
         engaging body copy (under 50 words), and a clear Call to Action (CTA).\n\
         Format the output strictly as a JSON array of objects with 'headline', 'body', and 'cta'."
            .to_string(),
    );
    parts.join("\n")
}

/// Models often wrap JSON in a ```json fence. Returns the fenced body when
/// present, otherwise the trimmed text.
pub fn extract_json_block(text: &str) -> &str {
    if let Some(start) = text.find("```json") {
        let body = &text[start + "```json".len()..];
        if let Some(end) = body.rfind("```") {
            return body[..end].trim();
        }
    }
    text.trim()
}

pub fn parse_ad_copies(raw: &str) -> Result<Vec<AdCopy>, AiError> {
    serde_json::from_str(extract_json_block(raw)).map_err(|e| AiError::Decode(e.to_string()))
}

pub fn image_prompt(request: &ImageRequest) -> String {
    let mut prompt = request.prompt.clone();
    if let Some(style) = request.style.as_ref().filter(|s| !s.is_empty()) {
        prompt.push_str(&format!(", in a {style} style"));
    }
    if let Some(elements) = request
        .branding_elements
        .as_ref()
        .filter(|e| !e.is_empty())
    {
        prompt.push_str(&format!(", with {}", elements.join(", ")));
    }
    prompt
}
