use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;

use super::app_state::AppState;
use super::{account_routes as accounts, generate_routes as generate, meta_routes as meta};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// Builds the full route table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(generate::health))
        .route("/token", post(accounts::login))
        .route("/register", post(accounts::register))
        .route("/upload-model", post(accounts::upload_model))
        .route("/models", get(accounts::list_models))
        .route("/meta-status", get(accounts::meta_status))
        .route("/api/v1/generate/ad_copy", post(generate::ad_copy))
        .route("/api/v1/generate/image", post(generate::image))
        .route("/api/v1/generate/video", post(generate::video))
        .route("/api/v1/upload", post(generate::upload))
        .route("/api/v1/tasks/:task_id", get(generate::task_status))
        .route("/chat", post(generate::chat))
        .route("/api/v1/platforms/meta/auth_start", get(meta::auth_start))
        .route("/api/v1/platforms/meta/oauth_callback", get(meta::oauth_callback))
        .route("/api/v1/platforms/meta/upload/image", post(meta::upload_image))
        .route("/api/v1/platforms/meta/upload/video", post(meta::upload_video))
        .route("/api/v1/platforms/meta/create_ad", post(meta::create_ad))
        .route("/api/v1/platforms/meta/publish_ad", post(meta::publish_ad))
        .with_state(state)
}

pub async fn serve(state: AppState, bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
