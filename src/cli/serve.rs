// Composition root for the ad studio: builds every client from the
// environment, starts the job worker and hands the state to the router.

use std::sync::Arc;

use crate::api::{self, AppState};
use crate::core::accounts::{AccountService, MetaTokenStore, ModelRegistry, TokenIssuer, UserStore};
use crate::core::ads::{
    AdImageService, AdService, AdWorker, MetaAdsApi, MetaAppConfig, MetaOAuth, MockModelRenderer, VideoService,
};
use crate::core::ai::{AiProvider, AiService, ChatRouter};
use crate::core::config::{optional, require_all, ConfigError, EnvSource};
use crate::core::jobs::JobQueue;
use crate::core::storage::{Downloader, ObjectStore, S3Config, S3_VARS};
use crate::infra::accounts::sqlite_store::DEFAULT_DATABASE_URL;
use crate::infra::accounts::SqliteAccountStore;
use crate::infra::ai::{GeminiClient, GrokClient, LibreTranslateClient, OpenAiClient};
use crate::infra::media::{FfmpegRenderer, GttsClient, HttpDownloader, S3Store};
use crate::infra::meta::GraphClient;

pub const DEFAULT_SECRET_KEY: &str = "change_me";
pub const DEFAULT_DEMO_USERNAME: &str = "demo";
pub const DEFAULT_DEMO_PASSWORD: &str = "password";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    pub gemini_key: String,
    pub openai_key: String,
    pub s3: S3Config,
    pub secret_key: String,
    pub demo_username: String,
    pub demo_password: String,
    pub database_url: String,
    pub bind_addr: String,
    pub meta: MetaAppConfig,
    pub grok_url: Option<String>,
    pub grok_key: Option<String>,
    pub libretranslate_url: Option<String>,
    pub ffmpeg_binary: Option<String>,
    pub font_file: Option<String>,
    pub mock_3d_url: Option<String>,
}

impl ServeConfig {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let mut names = vec!["GEMINI_API_KEY", "OPENAI_API_KEY"];
        names.extend(S3_VARS);
        let mut values = require_all(env, &names)?.into_iter();
        let mut next = || values.next().unwrap_or_default();
        let gemini_key = next();
        let openai_key = next();

        Ok(Self {
            gemini_key,
            openai_key,
            s3: S3Config::from_env(env)?,
            secret_key: optional(env, "SECRET_KEY").unwrap_or_else(|| DEFAULT_SECRET_KEY.to_string()),
            demo_username: optional(env, "DEMO_USERNAME").unwrap_or_else(|| DEFAULT_DEMO_USERNAME.to_string()),
            demo_password: optional(env, "DEMO_PASSWORD").unwrap_or_else(|| DEFAULT_DEMO_PASSWORD.to_string()),
            database_url: optional(env, "DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: optional(env, "BIND_ADDR").unwrap_or_else(|| api::server::DEFAULT_BIND_ADDR.to_string()),
            meta: MetaAppConfig::from_env(env),
            grok_url: optional(env, "GROK_API_URL"),
            grok_key: optional(env, "GROK_API_KEY"),
            libretranslate_url: optional(env, "LIBRETRANSLATE_URL"),
            ffmpeg_binary: optional(env, "FFMPEG_BINARY"),
            font_file: optional(env, "FFMPEG_FONT_FILE"),
            mock_3d_url: optional(env, "MOCK_RENDERED_3D_VIDEO_URL"),
        })
    }
}

/// Wires the live clients. Must run inside the tokio runtime because the
/// job worker is spawned here.
pub async fn build_state(config: &ServeConfig) -> anyhow::Result<AppState> {
    let accounts_db = Arc::new(SqliteAccountStore::new(&config.database_url).await?);
    let users: Arc<dyn UserStore> = accounts_db.clone();
    let meta_links: Arc<dyn MetaTokenStore> = accounts_db;
    let accounts = AccountService::new(users, TokenIssuer::new(config.secret_key.clone()));
    accounts
        .ensure_user(&config.demo_username, &config.demo_password)
        .await?;

    let downloader: Arc<dyn Downloader> = Arc::new(HttpDownloader::default());
    let store: Arc<dyn ObjectStore> = Arc::new(S3Store::new(config.s3.clone()));
    let openai = Arc::new(OpenAiClient::new(config.openai_key.clone()));
    let gemini: Arc<dyn AiProvider> = Arc::new(GeminiClient::new(config.gemini_key.clone()));

    let chat = ChatRouter::new(
        Box::new(GrokClient::new(config.grok_url.clone(), config.grok_key.clone())),
        Box::new(openai.clone()),
        Some(Box::new(LibreTranslateClient::new(config.libretranslate_url.clone()))),
    );
    let images = AdImageService::new(openai, downloader.clone(), store.clone());

    let graph = Arc::new(GraphClient::new());
    let meta_api: Arc<dyn MetaAdsApi> = graph.clone();
    let meta_oauth: Arc<dyn MetaOAuth> = graph;

    let videos = VideoService::new(
        downloader.clone(),
        Arc::new(GttsClient::default()),
        Arc::new(MockModelRenderer::new(config.mock_3d_url.clone())),
        Arc::new(FfmpegRenderer::new(config.ffmpeg_binary.clone(), config.font_file.clone())),
        store.clone(),
    );
    let worker = AdWorker::new(videos, AdService::new(meta_api.clone(), downloader.clone()));
    let jobs = JobQueue::start(Arc::new(worker));

    if config.meta.credentials().is_err() {
        tracing::warn!("Meta app credentials are not set; Meta OAuth routes will fail");
    }

    Ok(AppState {
        accounts: Arc::new(accounts),
        meta_links,
        models: Arc::new(ModelRegistry::default()),
        copywriter: Arc::new(AiService::new(gemini)),
        images: Arc::new(images),
        chat: Arc::new(chat),
        store,
        jobs,
        ads: Arc::new(AdService::new(meta_api, downloader)),
        meta_oauth,
        meta_app: Arc::new(config.meta.clone()),
    })
}

pub async fn run_serve(bind: Option<String>, env: &dyn EnvSource) -> anyhow::Result<()> {
    let mut config = ServeConfig::from_env(env)?;
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    let state = build_state(&config).await?;
    api::serve(state, &config.bind_addr).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MapEnv;

    fn required() -> MapEnv {
        MapEnv::new()
            .with("GEMINI_API_KEY", "g")
            .with("OPENAI_API_KEY", "o")
            .with("AWS_ACCESS_KEY_ID", "a")
            .with("AWS_SECRET_ACCESS_KEY", "s")
            .with("AWS_REGION", "us-east-1")
            .with("S3_BUCKET_NAME", "ads")
    }

    #[test]
    fn startup_lists_every_missing_key() {
        let err = ServeConfig::from_env(&MapEnv::new().with("OPENAI_API_KEY", "o")).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingMany(vec![
                "GEMINI_API_KEY".to_string(),
                "AWS_ACCESS_KEY_ID".to_string(),
                "AWS_SECRET_ACCESS_KEY".to_string(),
                "AWS_REGION".to_string(),
                "S3_BUCKET_NAME".to_string(),
            ])
        );
    }

    #[test]
    fn optional_settings_fall_back_to_defaults() {
        let config = ServeConfig::from_env(&required()).unwrap();
        assert_eq!(config.gemini_key, "g");
        assert_eq!(config.openai_key, "o");
        assert_eq!(config.s3.bucket, "ads");
        assert_eq!(config.secret_key, DEFAULT_SECRET_KEY);
        assert_eq!(config.demo_username, "demo");
        assert_eq!(config.demo_password, "password");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.meta, MetaAppConfig::default());
        assert!(config.grok_key.is_none());
    }

    #[tokio::test]
    async fn state_builds_against_an_in_memory_database() {
        let env = required()
            .with("DATABASE_URL", "sqlite::memory:")
            .with("DEMO_USERNAME", "ana")
            .with("DEMO_PASSWORD", "pw");
        let config = ServeConfig::from_env(&env).unwrap();
        let state = build_state(&config).await.unwrap();

        let token = state.accounts.login("ana", "pw").await.unwrap();
        assert_eq!(state.accounts.authenticate(&token).await.unwrap(), "ana");
        assert!(state.meta_links.link("ana").await.unwrap().is_none());
    }
}
