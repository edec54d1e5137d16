use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::notion::{NotionApi, NotionError, NotionPage};

pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";

/// Integration-token client for the Notion REST API.
pub struct NotionClient {
    client: Client,
    token: String,
    base_url: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<NotionPage>,
}

#[derive(Deserialize)]
struct CreatedDatabase {
    id: String,
}

impl NotionClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, NOTION_API_BASE)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .header("Content-Type", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, NotionError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| NotionError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(NotionError::Api { status, body });
        }
        Ok(response)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, NotionError> {
        response
            .json::<T>()
            .await
            .map_err(|e| NotionError::Decode(e.to_string()))
    }
}

#[async_trait]
impl NotionApi for NotionClient {
    async fn create_page(&self, body: &Value) -> Result<NotionPage, NotionError> {
        let url = format!("{}/pages", self.base_url);
        let response = self.send(self.client.post(url).json(body)).await?;
        Self::decode(response).await
    }

    async fn query_database(
        &self,
        database_id: &str,
        query: &Value,
    ) -> Result<Vec<NotionPage>, NotionError> {
        let url = format!("{}/databases/{}/query", self.base_url, database_id);
        let response = self.send(self.client.post(url).json(query)).await?;
        let parsed: QueryResponse = Self::decode(response).await?;
        tracing::debug!(database_id, results = parsed.results.len(), "Notion query");
        Ok(parsed.results)
    }

    async fn update_page(&self, page_id: &str, properties: &Value) -> Result<(), NotionError> {
        let url = format!("{}/pages/{}", self.base_url, page_id);
        let body = json!({ "properties": properties });
        self.send(self.client.patch(url).json(&body)).await?;
        Ok(())
    }

    async fn create_database(&self, body: &Value) -> Result<String, NotionError> {
        let url = format!("{}/databases", self.base_url);
        let response = self.send(self.client.post(url).json(body)).await?;
        let created: CreatedDatabase = Self::decode(response).await?;
        Ok(created.id)
    }
}
