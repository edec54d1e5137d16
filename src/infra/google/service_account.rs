// Google OAuth2 for service accounts: sign a JWT with the account's RSA key,
// trade it for a bearer token, reuse that token until shortly before expiry.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::config::{optional, EnvSource};
use crate::core::drive::DriveError;

pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";
pub const DEFAULT_KEY_FILE: &str = "credentials.json";
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expiry")]
    expires_in: u64,
}

fn default_expiry() -> u64 {
    3600
}

struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    scope: String,
    client: Client,
    cached: Arc<RwLock<Option<CachedToken>>>,
}

impl ServiceAccountAuth {
    pub fn from_json(json: &str, scope: &str) -> Result<Self, DriveError> {
        let key: ServiceAccountKey =
            serde_json::from_str(json).map_err(|e| DriveError::Auth(format!("bad key file: {e}")))?;
        Ok(Self {
            key,
            scope: scope.to_string(),
            client: Client::new(),
            cached: Arc::new(RwLock::new(None)),
        })
    }

    pub async fn from_file(path: &Path, scope: &str) -> Result<Self, DriveError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content, scope)
    }

    /// Inline JSON in `GOOGLE_SERVICE_ACCOUNT_JSON` wins; otherwise the key
    /// file at `creds` or `SERVICE_ACCOUNT_FILE` or `credentials.json`.
    pub async fn from_env(env: &dyn EnvSource, creds: Option<&Path>) -> Result<Self, DriveError> {
        if let Some(json) = optional(env, "GOOGLE_SERVICE_ACCOUNT_JSON") {
            return Self::from_json(&json, DRIVE_FILE_SCOPE);
        }
        let path = creds
            .map(Path::to_path_buf)
            .or_else(|| optional(env, "SERVICE_ACCOUNT_FILE").map(Into::into))
            .unwrap_or_else(|| DEFAULT_KEY_FILE.into());
        Self::from_file(&path, DRIVE_FILE_SCOPE).await
    }

    pub async fn access_token(&self) -> Result<String, DriveError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > SystemTime::now() + REFRESH_MARGIN {
                    return Ok(token.token.clone());
                }
            }
        }

        let fresh = self.fetch_token().await?;
        let token = fresh.access_token.clone();
        *self.cached.write().await = Some(CachedToken {
            token: fresh.access_token,
            expires_at: SystemTime::now() + Duration::from_secs(fresh.expires_in),
        });
        Ok(token)
    }

    fn signed_assertion(&self, now: u64) -> Result<String, DriveError> {
        let claims = JwtClaims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| DriveError::Auth(e.to_string()))?;
        encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| DriveError::Auth(e.to_string()))
    }

    async fn fetch_token(&self) -> Result<TokenResponse, DriveError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| DriveError::Auth(e.to_string()))?
            .as_secs();
        let assertion = self.signed_assertion(now)?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| DriveError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DriveError::Auth(format!("token exchange failed ({status}): {text}")));
        }

        tracing::debug!(account = %self.key.client_email, "Fetched Google access token");
        response
            .json()
            .await
            .map_err(|e| DriveError::Auth(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_without_token_uri_uses_google_default() {
        let auth = ServiceAccountAuth::from_json(
            r#"{"client_email":"bot@proj.iam.gserviceaccount.com","private_key":"not-a-key"}"#,
            DRIVE_FILE_SCOPE,
        )
        .unwrap();
        assert_eq!(auth.key.token_uri, "https://oauth2.googleapis.com/token");
        assert_eq!(auth.scope, DRIVE_FILE_SCOPE);
    }

    #[test]
    fn malformed_key_is_an_auth_error() {
        assert!(matches!(
            ServiceAccountAuth::from_json("{}", DRIVE_FILE_SCOPE),
            Err(DriveError::Auth(_))
        ));
    }

    #[test]
    fn bad_pem_fails_at_signing() {
        let auth = ServiceAccountAuth::from_json(
            r#"{"client_email":"bot@x","private_key":"garbage","token_uri":"https://t"}"#,
            DRIVE_FILE_SCOPE,
        )
        .unwrap();
        assert!(matches!(auth.signed_assertion(0), Err(DriveError::Auth(_))));
    }
}
