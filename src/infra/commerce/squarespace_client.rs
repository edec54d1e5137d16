use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::core::commerce::{CommerceError, SquarespaceApi, SquarespaceConfig};

const BASE_URL: &str = "https://api.squarespace.com/1.0";
const USER_AGENT: &str = "ClipOpera-Client";

pub struct SquarespaceClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl SquarespaceClient {
    pub fn new(config: &SquarespaceConfig) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn product_url(&self, product_id: &str) -> String {
        format!("{}/commerce/products/{product_id}", self.base_url)
    }
}

#[async_trait]
impl SquarespaceApi for SquarespaceClient {
    async fn update_description(&self, product_id: &str, description: &str) -> Result<(), CommerceError> {
        let response = self
            .client
            .patch(self.product_url(product_id))
            .bearer_auth(&self.api_key)
            .header("User-Agent", USER_AGENT)
            .json(&json!({ "fullDescription": description }))
            .send()
            .await
            .map_err(|e| CommerceError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CommerceError::Api { status, body });
        }
        Ok(())
    }
}
