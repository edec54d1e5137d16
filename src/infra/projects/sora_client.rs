use async_trait::async_trait;
use reqwest::Client;

use crate::core::projects::kickoff::SORA_SYNC_URL;
use crate::core::projects::{SoraError, SoraPayload, SoraSync};

pub struct SoraClient {
    client: Client,
    api_key: String,
}

impl SoraClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl SoraSync for SoraClient {
    async fn sync(&self, payload: &SoraPayload) -> Result<(), SoraError> {
        let response = self
            .client
            .post(SORA_SYNC_URL)
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| SoraError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SoraError::Api { status, body });
        }
        tracing::info!(project = %payload.project, "Synced project to Sora");
        Ok(())
    }
}
