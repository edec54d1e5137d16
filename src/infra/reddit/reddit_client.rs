use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::core::reddit::{RedditCredentials, RedditError, RedditSubmitter, USER_AGENT};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const SUBMIT_URL: &str = "https://oauth.reddit.com/api/submit";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// Script-app client using the password grant.
pub struct RedditClient {
    client: Client,
    credentials: RedditCredentials,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> Self {
        Self {
            client: Client::new(),
            credentials,
        }
    }

    async fn access_token(&self) -> Result<String, RedditError> {
        let creds = &self.credentials;
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .header("User-Agent", USER_AGENT)
            .form(&[
                ("grant_type", "password"),
                ("username", creds.username.as_str()),
                ("password", creds.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RedditError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RedditError::Auth(format!("{status} - {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| RedditError::Auth(e.to_string()))?;
        match (token.access_token, token.error) {
            (Some(token), _) => Ok(token),
            (None, Some(error)) => Err(RedditError::Auth(error)),
            (None, None) => Err(RedditError::Auth("no access token in response".to_string())),
        }
    }
}

/// Pulls the new post's fullname out of an `api_type=json` submit response,
/// or the first error Reddit reported.
pub fn parse_submit_response(body: &Value) -> Result<String, RedditError> {
    let json = &body["json"];
    if let Some(errors) = json["errors"].as_array() {
        if let Some(first) = errors.first() {
            return Err(RedditError::Api(first.to_string()));
        }
    }
    json["data"]["name"]
        .as_str()
        .or_else(|| json["data"]["url"].as_str())
        .map(str::to_string)
        .ok_or_else(|| RedditError::Api(format!("unexpected submit response: {body}")))
}

#[async_trait]
impl RedditSubmitter for RedditClient {
    async fn submit_self_post(
        &self,
        subreddit: &str,
        title: &str,
        body: &str,
    ) -> Result<String, RedditError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .post(SUBMIT_URL)
            .bearer_auth(token)
            .header("User-Agent", USER_AGENT)
            .form(&[
                ("sr", subreddit),
                ("kind", "self"),
                ("title", title),
                ("text", body),
                ("api_type", "json"),
            ])
            .send()
            .await
            .map_err(|e| RedditError::Api(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RedditError::Api(format!("{status} - {text}")));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| RedditError::Api(e.to_string()))?;
        parse_submit_response(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submit_response_yields_fullname() {
        let body = json!({ "json": { "errors": [], "data": { "name": "t3_xyz", "url": "https://reddit.com/r/test/xyz" } } });
        assert_eq!(parse_submit_response(&body).unwrap(), "t3_xyz");
    }

    #[test]
    fn submit_errors_are_surfaced() {
        let body = json!({ "json": { "errors": [["SUBREDDIT_NOEXIST", "that subreddit doesn't exist", "sr"]] } });
        let err = parse_submit_response(&body).unwrap_err();
        assert!(err.to_string().contains("SUBREDDIT_NOEXIST"));
    }
}
