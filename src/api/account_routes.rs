// Login, registration, per-user 3D models and Meta link status.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::api_error::{ApiError, ValidForm, ValidJson};
use super::app_state::{AppState, CurrentUser};
use crate::core::accounts::UserModel;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

pub async fn login(State(state): State<AppState>, ValidForm(form): ValidForm<Credentials>) -> Result<Json<Value>, ApiError> {
    let access_token = state.accounts.login(&form.username, &form.password).await?;
    Ok(Json(json!({ "access_token": access_token, "token_type": "bearer" })))
}

pub async fn register(State(state): State<AppState>, ValidJson(input): ValidJson<Credentials>) -> Result<Json<Value>, ApiError> {
    state.accounts.register(&input.username, &input.password).await?;
    Ok(Json(json!({ "message": "registered" })))
}

/// One uploaded multipart file.
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Reads the `file` field; anything else in the form is ignored.
pub async fn file_field(multipart: &mut Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        return Ok(UploadedFile {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::unprocessable("file is required"))
}

pub async fn upload_model(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let file = file_field(&mut multipart).await?;
    let key = format!("models/{user}/{}_{}", uuid::Uuid::new_v4(), file.filename);
    let url = state
        .store
        .put_object(&key, file.bytes, &file.content_type)
        .await
        .map_err(|e| ApiError::internal(format!("Upload failed: {e}")))?;
    state.models.add(&user, &file.filename, &url);
    Ok(Json(json!({ "url": url })))
}

pub async fn list_models(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Json<Vec<UserModel>> {
    Json(state.models.list(&user))
}

pub async fn meta_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let linked = state.meta_links.link(&user).await?.is_some();
    Ok(Json(json!({ "linked": linked })))
}
