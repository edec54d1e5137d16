use async_trait::async_trait;
use reqwest::Client;

use crate::core::storage::{Downloader, StorageError};
use crate::infra::retry::RetryPolicy;

/// GETs remote assets into memory, retrying transient failures.
pub struct HttpDownloader {
    client: Client,
    retry: RetryPolicy,
}

impl HttpDownloader {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            retry,
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::Http(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Api { status, body });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let bytes = self.retry.run("download", || self.fetch(url)).await?;
        tracing::debug!(url, bytes = bytes.len(), "Downloaded asset");
        Ok(bytes)
    }
}
