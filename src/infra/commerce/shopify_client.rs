use async_trait::async_trait;
use reqwest::Client;

use crate::core::commerce::{CommerceError, ShopifyApi, ShopifyConfig, ShopifyProductEnvelope};

/// Admin REST API with private-app basic auth.
pub struct ShopifyClient {
    client: Client,
    config: ShopifyConfig,
}

impl ShopifyClient {
    pub fn new(config: ShopifyConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ShopifyApi for ShopifyClient {
    async fn create_product(&self, product: &ShopifyProductEnvelope) -> Result<(), CommerceError> {
        let response = self
            .client
            .post(self.config.products_url())
            .basic_auth(&self.config.api_key, Some(&self.config.api_password))
            .json(product)
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
