use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::core::accounts::AccountError;
use crate::core::ads::{CreativeError, MetaError, VideoError};
use crate::core::ai::AiError;

/// Error body is always `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    /// Bad input is a 422; anything the vendor did is a 500 prefixed with
    /// what we were doing.
    pub fn from_ai(context: &str, error: AiError) -> Self {
        match error {
            AiError::InvalidInput(msg) => Self::unprocessable(msg),
            other => Self::internal(format!("{context} error: {other}")),
        }
    }

    pub fn from_creative(context: &str, error: CreativeError) -> Self {
        match error {
            CreativeError::Ai(e) => Self::from_ai(context, e),
            CreativeError::Storage(e) => Self::internal(format!("{context} error: {e}")),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(error: AccountError) -> Self {
        match error {
            AccountError::UserExists => Self::bad_request(error.to_string()),
            AccountError::InvalidCredentials | AccountError::InvalidToken => {
                Self::new(StatusCode::UNAUTHORIZED, error.to_string())
            }
            AccountError::Store(_) => Self::internal(error.to_string()),
        }
    }
}

impl From<MetaError> for ApiError {
    fn from(error: MetaError) -> Self {
        match error {
            MetaError::NotConfigured => Self::internal(error.to_string()),
            MetaError::NotAuthorized => Self::bad_request(error.to_string()),
            MetaError::InvalidInput(msg) => Self::unprocessable(msg),
            other => Self::internal(format!("Meta error: {other}")),
        }
    }
}

impl From<VideoError> for ApiError {
    fn from(error: VideoError) -> Self {
        match error {
            VideoError::InvalidInput(msg) => Self::unprocessable(msg),
            other => Self::internal(format!("Video error: {other}")),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

/// `axum::Json` whose rejection is a 422 `{"detail"}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ValidJson<T>(pub T);

/// `axum::extract::Query` with the same rejection shape as [`ValidJson`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ValidQuery<T>(pub T);

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Form), rejection(ApiError))]
pub struct ValidForm<T>(pub T);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": self.detail }));
        if self.status == StatusCode::UNAUTHORIZED {
            return (self.status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_failures_are_prefixed_500s() {
        let err = ApiError::from_ai("Ad copy generation", AiError::Http("timeout".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.detail.starts_with("Ad copy generation error: "));
        assert!(err.detail.contains("timeout"));
    }

    #[test]
    fn invalid_input_is_unprocessable() {
        let err = ApiError::from_ai("Image generation", AiError::InvalidInput("bad ratio".into()));
        assert_eq!(err, ApiError::unprocessable("bad ratio"));
    }

    #[test]
    fn account_errors_map_to_auth_statuses() {
        assert_eq!(ApiError::from(AccountError::UserExists).status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(AccountError::InvalidToken).status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(MetaError::NotAuthorized),
            ApiError::bad_request("User not authorized")
        );
    }
}
