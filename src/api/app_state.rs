use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;

use super::api_error::ApiError;
use crate::core::accounts::{AccountService, MetaTokenStore, ModelRegistry, UserStore};
use crate::core::ads::{AdImageService, AdService, MetaAdsApi, MetaAppConfig, MetaOAuth};
use crate::core::ai::{AiProvider, AiService, ChatRouter};
use crate::core::jobs::JobQueue;
use crate::core::storage::ObjectStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService<Arc<dyn UserStore>>>,
    pub meta_links: Arc<dyn MetaTokenStore>,
    pub models: Arc<ModelRegistry>,
    pub copywriter: Arc<AiService<Arc<dyn AiProvider>>>,
    pub images: Arc<AdImageService>,
    pub chat: Arc<ChatRouter>,
    pub store: Arc<dyn ObjectStore>,
    pub jobs: JobQueue,
    pub ads: Arc<AdService<Arc<dyn MetaAdsApi>>>,
    pub meta_oauth: Arc<dyn MetaOAuth>,
    pub meta_app: Arc<MetaAppConfig>,
}

impl AppState {
    /// Stored Meta token for `user_id`, or "User not authorized".
    pub async fn meta_token(&self, user_id: &str) -> Result<String, ApiError> {
        self.meta_links
            .link(user_id)
            .await?
            .map(|link| link.access_token)
            .ok_or_else(|| ApiError::bad_request("User not authorized"))
    }
}

/// Username behind a valid `Authorization: Bearer` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::new(StatusCode::UNAUTHORIZED, "Not authenticated"))?;
        let username = state.accounts.authenticate(token.trim()).await?;
        Ok(CurrentUser(username))
    }
}
