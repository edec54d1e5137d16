// Meta (Facebook) account linking, asset uploads and queued ad creation.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::api_error::{ApiError, ValidJson, ValidQuery};
use super::app_state::AppState;
use crate::core::ads::{link_account, CampaignConfig, MetaAdRequest};
use crate::core::jobs::JobKind;

#[derive(Debug, Deserialize)]
pub struct AuthStart {
    pub user_id: String,
}

pub async fn auth_start(State(state): State<AppState>, ValidQuery(q): ValidQuery<AuthStart>) -> Result<Json<Value>, ApiError> {
    let auth_url = state.meta_app.auth_url(&q.user_id)?;
    Ok(Json(json!({ "auth_url": auth_url })))
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    pub code: String,
    pub state: String,
}

pub async fn oauth_callback(
    State(state): State<AppState>,
    ValidQuery(q): ValidQuery<OAuthCallback>,
) -> Result<Json<Value>, ApiError> {
    let link = link_account(state.meta_oauth.as_ref(), &state.meta_app, &q.code).await?;
    state.meta_links.save_link(&q.state, &link).await?;
    tracing::info!(user_id = %q.state, meta_user_id = %link.meta_user_id, "Linked Meta account");
    Ok(Json(json!({ "meta_user_id": link.meta_user_id })))
}

#[derive(Debug, Deserialize)]
pub struct ImageUpload {
    pub user_id: String,
    pub ad_account_id: String,
    pub image_url: String,
}

pub async fn upload_image(State(state): State<AppState>, ValidQuery(q): ValidQuery<ImageUpload>) -> Result<Json<Value>, ApiError> {
    let token = state.meta_token(&q.user_id).await?;
    let hash = state
        .ads
        .upload_image_from(&token, &q.ad_account_id, &q.image_url)
        .await?;
    Ok(Json(json!({ "image_hash": hash })))
}

#[derive(Debug, Deserialize)]
pub struct VideoUpload {
    pub user_id: String,
    pub ad_account_id: String,
    pub video_url: String,
}

pub async fn upload_video(State(state): State<AppState>, ValidQuery(q): ValidQuery<VideoUpload>) -> Result<Json<Value>, ApiError> {
    let token = state.meta_token(&q.user_id).await?;
    let video_id = state
        .ads
        .upload_video_from(&token, &q.ad_account_id, &q.video_url)
        .await?;
    Ok(Json(json!({ "video_id": video_id })))
}

pub async fn create_ad(State(state): State<AppState>, ValidJson(request): ValidJson<MetaAdRequest>) -> Result<Json<Value>, ApiError> {
    let access_token = state.meta_token(&request.user_id).await?;
    let id = state.jobs.submit(JobKind::CreateMetaAd {
        access_token,
        request,
    });
    Ok(Json(json!({ "task_id": id })))
}

/// A token in the body wins over the linked account's token.
pub async fn publish_ad(State(state): State<AppState>, ValidJson(config): ValidJson<CampaignConfig>) -> Result<Json<Value>, ApiError> {
    config.asset_kind()?;
    let access_token = match config.access_token.clone().filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => state.meta_token(&config.user_id).await?,
    };
    let id = state.jobs.submit(JobKind::PublishMetaAd {
        access_token,
        config,
    });
    Ok(Json(json!({ "task_id": id })))
}
