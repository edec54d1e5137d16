use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::service_account::ServiceAccountAuth;
use crate::core::drive::{folder_query, DriveApi, DriveError, DriveFile, FOLDER_MIME};

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart&fields=id,webViewLink";

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Drive v3 over REST, authorised as a service account.
pub struct GoogleDriveClient {
    client: Client,
    auth: ServiceAccountAuth,
}

impl GoogleDriveClient {
    pub fn new(auth: ServiceAccountAuth) -> Self {
        Self {
            client: Client::new(),
            auth,
        }
    }

    async fn checked(response: reqwest::Response) -> Result<reqwest::Response, DriveError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(DriveError::Api { status, body })
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, DriveError> {
        Self::checked(response)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::Http(e.to_string()))
    }
}

#[async_trait]
impl DriveApi for GoogleDriveClient {
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<String>, DriveError> {
        let token = self.auth.access_token().await?;
        let query = folder_query(name, parent_id);
        let response = self
            .client
            .get(FILES_URL)
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("fields", "files(id, name)")])
            .send()
            .await
            .map_err(|e| DriveError::Http(e.to_string()))?;
        let list: FileList = Self::decode(response).await?;
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String, DriveError> {
        let token = self.auth.access_token().await?;
        let metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME,
            "parents": [parent_id],
        });
        let response = self
            .client
            .post(FILES_URL)
            .bearer_auth(token)
            .query(&[("fields", "id")])
            .json(&metadata)
            .send()
            .await
            .map_err(|e| DriveError::Http(e.to_string()))?;
        let created: DriveFile = Self::decode(response).await?;
        tracing::info!(folder = name, id = %created.id, "Created Drive folder");
        Ok(created.id)
    }

    async fn upload_file(
        &self,
        path: &Path,
        name: &str,
        parent_id: &str,
        mime_type: &str,
    ) -> Result<DriveFile, DriveError> {
        let token = self.auth.access_token().await?;
        let bytes = tokio::fs::read(path).await?;
        let metadata = json!({ "name": name, "parents": [parent_id] });

        let boundary = format!("automation-hub-{}", uuid::Uuid::new_v4().simple());
        let body = related_body(&boundary, &metadata.to_string(), mime_type, &bytes);

        let response = self
            .client
            .post(UPLOAD_URL)
            .bearer_auth(token)
            .header("Content-Type", format!("multipart/related; boundary={boundary}"))
            .body(body)
            .send()
            .await
            .map_err(|e| DriveError::Http(e.to_string()))?;
        Self::decode(response).await
    }
}

/// `multipart/related` body: JSON metadata first, then the media.
fn related_body(boundary: &str, metadata: &str, mime_type: &str, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + metadata.len() + 256);
    body.extend_from_slice(
        format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n").as_bytes(),
    );
    body.extend_from_slice(format!("--{boundary}\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
