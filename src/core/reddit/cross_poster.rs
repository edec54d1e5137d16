// Publishes the newest "Published" Notion blog row to a subreddit and then
// flips the row to "Posted" so it is not picked up again.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::{require_all, ConfigError, EnvSource};
use crate::core::notion::NotionApi;

pub const REQUIRED_VARS: [&str; 6] = [
    "NOTION_API_KEY",
    "NOTION_DATABASE_ID",
    "REDDIT_CLIENT_ID",
    "REDDIT_CLIENT_SECRET",
    "REDDIT_USERNAME",
    "REDDIT_PASSWORD",
];
pub const DEFAULT_SUBREDDIT: &str = "test";
pub const USER_AGENT: &str = "blog-to-reddit-script";

#[derive(Debug, Error)]
pub enum RedditError {
    #[error("Reddit authentication failed: {0}")]
    Auth(String),
    #[error("Reddit API error: {0}")]
    Api(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossPostConfig {
    pub notion_token: String,
    pub database_id: String,
    pub subreddit: String,
    pub reddit: RedditCredentials,
}

impl CrossPostConfig {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let values = require_all(env, &REQUIRED_VARS)?;
        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();

        let notion_token = next();
        let database_id = next();
        let reddit = RedditCredentials {
            client_id: next(),
            client_secret: next(),
            username: next(),
            password: next(),
        };
        let subreddit = crate::core::config::optional(env, "REDDIT_SUBREDDIT")
            .unwrap_or_else(|| DEFAULT_SUBREDDIT.to_string());

        Ok(Self {
            notion_token,
            database_id,
            subreddit,
            reddit,
        })
    }
}

/// Submits self posts. Returns the permalink or id of the new post.
#[async_trait]
pub trait RedditSubmitter: Send + Sync {
    async fn submit_self_post(
        &self,
        subreddit: &str,
        title: &str,
        body: &str,
    ) -> Result<String, RedditError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrossPostOutcome {
    NothingToPost,
    Posted { page_id: String, title: String },
    QueryFailed(String),
    SubmitFailed(String),
    /// The post went out but the Notion row still says "Published".
    StatusUpdateFailed { page_id: String, error: String },
}

pub fn published_query() -> Value {
    json!({
        "filter": { "property": "Status", "select": { "equals": "Published" } },
        "sorts": [{ "timestamp": "created_time", "direction": "descending" }]
    })
}

pub struct CrossPoster<N: NotionApi, R: RedditSubmitter> {
    notion: N,
    reddit: R,
}

impl<N: NotionApi, R: RedditSubmitter> CrossPoster<N, R> {
    pub fn new(notion: N, reddit: R) -> Self {
        Self { notion, reddit }
    }

    pub async fn post_latest(&self, database_id: &str, subreddit: &str) -> CrossPostOutcome {
        let pages = match self
            .notion
            .query_database(database_id, &published_query())
            .await
        {
            Ok(pages) => pages,
            Err(e) => {
                tracing::error!(error = %e, "Error querying Notion");
                return CrossPostOutcome::QueryFailed(e.to_string());
            }
        };

        let Some(page) = pages.first() else {
            tracing::info!("No published posts found.");
            return CrossPostOutcome::NothingToPost;
        };

        let title = page.title_text("Name");
        let content = page.rich_text("Content");

        if let Err(e) = self
            .reddit
            .submit_self_post(subreddit, &title, &content)
            .await
        {
            tracing::error!(error = %e, "Error posting to Reddit");
            return CrossPostOutcome::SubmitFailed(e.to_string());
        }
        tracing::info!(title = %title, subreddit, "Posted to Reddit");

        let posted = json!({ "Status": { "select": { "name": "Posted" } } });
        if let Err(e) = self.notion.update_page(&page.id, &posted).await {
            tracing::error!(page_id = %page.id, error = %e, "Error updating Notion status");
            return CrossPostOutcome::StatusUpdateFailed {
                page_id: page.id.clone(),
                error: e.to_string(),
            };
        }

        CrossPostOutcome::Posted {
            page_id: page.id.clone(),
            title,
        }
    }
}
