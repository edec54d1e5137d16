use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::config::{require_all, ConfigError, EnvSource};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("S3 request failed: {0}")]
    Http(String),
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
}

pub const S3_VARS: [&str; 4] = [
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_REGION",
    "S3_BUCKET_NAME",
];

impl S3Config {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let mut values = require_all(env, &S3_VARS)?.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            access_key_id: next(),
            secret_access_key: next(),
            region: next(),
            bucket: next(),
        })
    }

    pub fn public_url(&self, key: &str) -> String {
        public_url(&self.bucket, &self.region, key)
    }
}

pub fn public_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{bucket}.s3.{region}.amazonaws.com/{key}")
}

/// Publicly readable object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `key` and returns the public URL.
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Fetches a remote asset into memory.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Vec<u8>, StorageError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaceholderSummary {
    pub uploaded: usize,
    pub failed: usize,
}

/// Uploads every `.mp4` directly inside `dir` to `placeholders/{name}`.
pub async fn upload_placeholders(
    store: &dyn ObjectStore,
    dir: &Path,
) -> Result<PlaceholderSummary, StorageError> {
    let mut summary = PlaceholderSummary::default();
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_mp4 = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("mp4"))
            .unwrap_or(false);
        if is_mp4 && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let key = format!("placeholders/{name}");
        let result = match tokio::fs::read(&path).await {
            Ok(bytes) => store.put_object(&key, bytes, "video/mp4").await,
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(url) => {
                tracing::info!(file = %name, url = %url, "Uploaded placeholder");
                summary.uploaded += 1;
            }
            Err(e) => {
                tracing::error!(file = %name, error = %e, "Placeholder upload failed");
                summary.failed += 1;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Keeps objects in memory and answers with S3-style URLs.
    #[derive(Default)]
    pub struct MemoryStore {
        pub objects: Mutex<Vec<(String, Vec<u8>, String)>>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn put_object(
            &self,
            key: &str,
            bytes: Vec<u8>,
            content_type: &str,
        ) -> Result<String, StorageError> {
            self.objects
                .lock()
                .unwrap()
                .push((key.to_string(), bytes, content_type.to_string()));
            Ok(public_url("bucket", "us-east-1", key))
        }
    }
}

#[cfg(test)]
pub(crate) mod fake_downloads {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies by URL; unknown URLs fail like a 404.
    #[derive(Default)]
    pub struct CannedDownloads {
        pub bodies: HashMap<String, Vec<u8>>,
        pub requested: Mutex<Vec<String>>,
    }

    impl CannedDownloads {
        pub fn with(mut self, url: &str, body: &[u8]) -> Self {
            self.bodies.insert(url.to_string(), body.to_vec());
            self
        }
    }

    #[async_trait]
    impl Downloader for CannedDownloads {
        async fn download(&self, url: &str) -> Result<Vec<u8>, StorageError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.bodies.get(url).cloned().ok_or(StorageError::Api {
                status: 404,
                body: format!("no such object: {url}"),
            })
        }
    }
}
