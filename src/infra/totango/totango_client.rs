use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::core::totango::{Method, TotangoError, TotangoTransport};

/// Bearer-token transport rooted at an account's API base URL.
pub struct TotangoClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TotangoClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl TotangoTransport for TotangoClient {
    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Option<Value>, TotangoError> {
        let url = self.url(path);
        let request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };

        tracing::debug!(?method, path, "Calling Totango");
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| TotangoError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TotangoError::Api { status, body });
        }
        if method == Method::Delete {
            return Ok(None);
        }
        let value = response
            .json()
            .await
            .map_err(|e| TotangoError::Decode(e.to_string()))?;
        Ok(Some(value))
    }
}
