use async_trait::async_trait;
use reqwest::Client;

use crate::core::relay::{RelayError, WebhookPayload, WebhookSender};

/// Posts JSON payloads to a Discord channel webhook.
pub struct DiscordWebhook {
    client: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl WebhookSender for DiscordWebhook {
    async fn send(&self, payload: &WebhookPayload) -> Result<(), RelayError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| RelayError::Webhook(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Webhook(format!("{status} - {body}")));
        }
        Ok(())
    }
}
