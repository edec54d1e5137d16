// Public-read uploads to S3 with a hand-signed AWS Signature Version 4 PUT.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::{Digest, Sha256};

use crate::core::storage::{ObjectStore, S3Config, StorageError};
use crate::infra::retry::RetryPolicy;

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "s3";
const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const ACL: &str = "public-read";

pub struct S3Store {
    client: Client,
    config: S3Config,
    retry: RetryPolicy,
}

impl S3Store {
    pub fn new(config: S3Config) -> Self {
        Self {
            client: Client::new(),
            config,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn host(&self) -> String {
        format!("{}.s3.{}.amazonaws.com", self.config.bucket, self.config.region)
    }

    async fn put_once(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
        let signed = sign_put(&self.config, &self.host(), key, bytes, content_type, Utc::now())?;
        let response = self
            .client
            .put(format!("https://{}{}", self.host(), signed.canonical_uri))
            .header("Authorization", signed.authorization)
            .header("Content-Type", content_type)
            .header("x-amz-acl", ACL)
            .header("x-amz-content-sha256", signed.payload_hash)
            .header("x-amz-date", signed.amz_date)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Api { status, body });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.retry
            .run("s3-put", || self.put_once(key, &bytes, content_type))
            .await?;
        let url = self.config.public_url(key);
        tracing::info!(key, bytes = bytes.len(), "Uploaded object to S3");
        Ok(url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPut {
    pub canonical_uri: String,
    pub amz_date: String,
    pub payload_hash: String,
    pub authorization: String,
}

pub fn sign_put(
    config: &S3Config,
    host: &str,
    key: &str,
    body: &[u8],
    content_type: &str,
    now: DateTime<Utc>,
) -> Result<SignedPut, StorageError> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let payload_hash = hex::encode(Sha256::digest(body));
    let canonical_uri = format!("/{}", uri_encode_path(key));

    let headers = [
        ("content-type", content_type),
        ("host", host),
        ("x-amz-acl", ACL),
        ("x-amz-content-sha256", payload_hash.as_str()),
        ("x-amz-date", amz_date.as_str()),
    ];
    let request = canonical_request("PUT", &canonical_uri, &headers, &payload_hash);

    let scope = format!("{date}/{}/{SERVICE}/aws4_request", config.region);
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(request.as_bytes()))
    );
    let signing_key = signing_key(&config.secret_access_key, &date, &config.region, SERVICE)?;
    let signature = hex::encode(hmac(&signing_key, string_to_sign.as_bytes())?);

    let signed_headers = headers.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(";");
    let authorization = format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        config.access_key_id
    );

    Ok(SignedPut {
        canonical_uri,
        amz_date,
        payload_hash,
        authorization,
    })
}

/// Headers must already be lowercase and sorted by name.
pub fn canonical_request(method: &str, uri: &str, headers: &[(&str, &str)], payload_hash: &str) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{k}:{}\n", v.trim()))
        .collect();
    let signed_headers = headers.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(";");
    format!("{method}\n{uri}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}")
}

pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>, StorageError> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| StorageError::Http(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Percent-encodes everything except unreserved characters and `/`.
pub fn uri_encode_path(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => out.push(byte as char),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}
