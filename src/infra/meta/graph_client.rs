use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::core::ads::meta_ads::{AdEdge, MetaAdsApi, MetaError, GRAPH_API_VERSION};
use crate::core::ads::meta_auth::{AppCredentials, MetaOAuth};

const GRAPH_URL: &str = "https://graph.facebook.com";
const VIDEO_URL: &str = "https://graph-video.facebook.com";

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Deserialize)]
struct AccessToken {
    access_token: String,
}

/// Marketing and OAuth endpoints of the Graph API.
pub struct GraphClient {
    client: Client,
    graph_url: String,
    video_url: String,
}

impl Default for GraphClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphClient {
    pub fn new() -> Self {
        Self::with_base_urls(GRAPH_URL, VIDEO_URL)
    }

    pub fn with_base_urls(graph_url: &str, video_url: &str) -> Self {
        Self {
            client: Client::new(),
            graph_url: graph_url.trim_end_matches('/').to_string(),
            video_url: video_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{GRAPH_API_VERSION}/{path}", self.graph_url)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, MetaError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MetaError::Api { status, body });
        }
        response.json().await.map_err(|e| MetaError::Http(e.to_string()))
    }

    async fn get_token(&self, params: &[(&str, &str)]) -> Result<String, MetaError> {
        let response = self
            .client
            .get(self.url("oauth/access_token"))
            .query(params)
            .send()
            .await
            .map_err(|e| MetaError::Http(e.to_string()))?;
        let token: AccessToken = Self::decode(response).await?;
        Ok(token.access_token)
    }
}

/// Graph accepts objects as form fields; nested values travel as JSON text.
pub fn form_fields(params: &Value) -> Vec<(String, String)> {
    let Some(map) = params.as_object() else {
        return Vec::new();
    };
    map.iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

/// `{"images": {"<filename>": {"hash": "..."}}}` → the single hash.
pub fn image_hash(body: &Value) -> Option<String> {
    body["images"]
        .as_object()?
        .values()
        .find_map(|image| image["hash"].as_str().map(str::to_string))
}

#[async_trait]
impl MetaAdsApi for GraphClient {
    async fn create(&self, token: &str, account: &str, edge: AdEdge, params: &Value) -> Result<String, MetaError> {
        let mut fields = form_fields(params);
        fields.push(("access_token".to_string(), token.to_string()));
        let response = self
            .client
            .post(self.url(&format!("{account}/{}", edge.path())))
            .form(&fields)
            .send()
            .await
            .map_err(|e| MetaError::Http(e.to_string()))?;
        let created: Created = Self::decode(response).await?;
        tracing::debug!(edge = edge.path(), id = %created.id, "Created Graph object");
        Ok(created.id)
    }

    async fn upload_image(&self, token: &str, account: &str, bytes: Vec<u8>, filename: &str) -> Result<String, MetaError> {
        let form = Form::new()
            .text("access_token", token.to_string())
            .part("filename", Part::bytes(bytes).file_name(filename.to_string()));
        let response = self
            .client
            .post(self.url(&format!("{account}/adimages")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MetaError::Http(e.to_string()))?;
        let body: Value = Self::decode(response).await?;
        image_hash(&body).ok_or_else(|| MetaError::Http(format!("no image hash in response: {body}")))
    }

    async fn upload_video(&self, token: &str, account: &str, bytes: Vec<u8>, filename: &str) -> Result<String, MetaError> {
        let size = bytes.len();
        let form = Form::new()
            .text("access_token", token.to_string())
            .part("source", Part::bytes(bytes).file_name(filename.to_string()));
        let response = self
            .client
            .post(format!("{}/{GRAPH_API_VERSION}/{account}/advideos", self.video_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| MetaError::Http(e.to_string()))?;
        let created: Created = Self::decode(response).await?;
        tracing::info!(video_id = %created.id, bytes = size, "Uploaded ad video");
        Ok(created.id)
    }
}

#[async_trait]
impl MetaOAuth for GraphClient {
    async fn exchange_code(&self, app: AppCredentials<'_>, code: &str) -> Result<String, MetaError> {
        self.get_token(&[
            ("client_id", app.app_id),
            ("client_secret", app.app_secret),
            ("redirect_uri", app.redirect_uri),
            ("code", code),
        ])
        .await
    }

    async fn long_lived_token(&self, app: AppCredentials<'_>, token: &str) -> Result<String, MetaError> {
        self.get_token(&[
            ("grant_type", "fb_exchange_token"),
            ("client_id", app.app_id),
            ("client_secret", app.app_secret),
            ("fb_exchange_token", token),
        ])
        .await
    }

    async fn me(&self, token: &str) -> Result<String, MetaError> {
        let response = self
            .client
            .get(self.url("me"))
            .query(&[("access_token", token)])
            .send()
            .await
            .map_err(|e| MetaError::Http(e.to_string()))?;
        let me: Created = Self::decode(response).await?;
        Ok(me.id)
    }
}
