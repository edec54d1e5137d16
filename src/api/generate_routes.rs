use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::account_routes::file_field;
use super::api_error::{ApiError, ValidJson};
use super::app_state::AppState;
use crate::core::ads::VideoRequest;
use crate::core::ai::{AdCopyRequest, ImageRequest};
use crate::core::jobs::{JobKind, JobStatus};

pub async fn ad_copy(State(state): State<AppState>, ValidJson(input): ValidJson<AdCopyRequest>) -> Result<Json<Value>, ApiError> {
    let copies = state
        .copywriter
        .generate_ad_copy(&input)
        .await
        .map_err(|e| ApiError::from_ai("Ad copy generation", e))?;
    Ok(Json(json!({ "ad_copies": copies })))
}

pub async fn image(State(state): State<AppState>, ValidJson(input): ValidJson<ImageRequest>) -> Result<Json<Value>, ApiError> {
    let url = state
        .images
        .generate(&input)
        .await
        .map_err(|e| ApiError::from_creative("Image generation", e))?;
    Ok(Json(json!({ "image_url": url })))
}

pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<Value>, ApiError> {
    let file = file_field(&mut multipart).await?;
    let key = format!("uploads/{}_{}", Uuid::new_v4(), file.filename);
    let url = state
        .store
        .put_object(&key, file.bytes, &file.content_type)
        .await
        .map_err(|e| ApiError::internal(format!("Upload failed: {e}")))?;
    Ok(Json(json!({ "image_url": url })))
}

pub async fn video(State(state): State<AppState>, ValidJson(input): ValidJson<VideoRequest>) -> Result<Json<Value>, ApiError> {
    input.validate()?;
    let id = state.jobs.submit(JobKind::GenerateVideo(input));
    Ok(Json(json!({ "task_id": id })))
}

/// Ids that are not uuids can never have been issued, so they read as pending
/// like any other unknown id.
pub async fn task_status(State(state): State<AppState>, Path(task_id): Path<String>) -> Json<Value> {
    let status = match Uuid::parse_str(&task_id) {
        Ok(id) => state.jobs.status(&id),
        Err(_) => JobStatus::Pending,
    };
    Json(status.to_json())
}

#[derive(Debug, Deserialize)]
pub struct ChatInput {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

pub async fn chat(State(state): State<AppState>, ValidJson(input): ValidJson<ChatInput>) -> Response {
    let prompt = input.prompt.unwrap_or_default();
    if prompt.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "prompt required" }))).into_response();
    }
    match state.chat.reply(&prompt, input.lang.as_deref()).await {
        Ok(text) => Json(json!({ "text": text })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "LLM error");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "LLM failure" }))).into_response()
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
