// Posts freshly created Notion rows to a Discord webhook.
//
// The flow is: query rows with Status = "New", optionally mirror the first
// attachment to Google Drive, then send one webhook message per row.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::{optional, require_all, ConfigError, EnvSource};
use crate::core::notion::{NotionApi, NotionError, NotionFile, NotionPage};

pub const DEFAULT_TITLE: &str = "New Entry";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub notion_token: String,
    pub database_id: String,
    pub webhook_url: String,
    /// Attachments are only mirrored when this is set.
    pub drive_folder_id: Option<String>,
}

impl RelayConfig {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let [notion_token, database_id, webhook_url]: [String; 3] = require_all(
            env,
            &["NOTION_TOKEN", "NOTION_DATABASE_ID", "DISCORD_WEBHOOK_URL"],
        )?
        .try_into()
        .map_err(|_| ConfigError::Missing("NOTION_TOKEN".to_string()))?;

        Ok(Self {
            notion_token,
            database_id,
            webhook_url,
            drive_folder_id: optional(env, "GDRIVE_FOLDER_ID"),
        })
    }
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Notion(#[from] NotionError),
    #[error("Webhook delivery failed: {0}")]
    Webhook(String),
    #[error("Attachment mirroring failed: {0}")]
    Mirror(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookEmbed {
    pub title: String,
    pub description: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookPayload {
    pub content: String,
    pub embeds: Vec<WebhookEmbed>,
}

#[async_trait]
pub trait WebhookSender: Send + Sync {
    async fn send(&self, payload: &WebhookPayload) -> Result<(), RelayError>;
}

/// Copies a Notion attachment somewhere shareable and returns its link.
#[async_trait]
pub trait FileMirror: Send + Sync {
    async fn mirror(&self, file: &NotionFile) -> Result<String, RelayError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaySummary {
    pub sent: usize,
    pub failed: usize,
}

/// Filter used to find rows that have not been announced yet.
pub fn new_entries_query() -> Value {
    json!({
        "filter": {
            "property": "Status",
            "rich_text": { "equals": "New" }
        }
    })
}

pub fn build_payload(page: &NotionPage, drive_url: Option<String>) -> WebhookPayload {
    let title = page
        .first_title("Name")
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let description = page.first_rich_text("Description").unwrap_or_default();

    WebhookPayload {
        content: title.clone(),
        embeds: vec![WebhookEmbed {
            title,
            description,
            url: drive_url,
        }],
    }
}

pub struct NotionRelay<N: NotionApi, W: WebhookSender> {
    notion: N,
    webhook: W,
    mirror: Option<Box<dyn FileMirror>>,
}

impl<N: NotionApi, W: WebhookSender> NotionRelay<N, W> {
    pub fn new(notion: N, webhook: W, mirror: Option<Box<dyn FileMirror>>) -> Self {
        Self {
            notion,
            webhook,
            mirror,
        }
    }

    pub async fn run(&self, database_id: &str) -> Result<RelaySummary, RelayError> {
        let entries = self
            .notion
            .query_database(database_id, &new_entries_query())
            .await?;
        tracing::info!(count = entries.len(), "Fetched new Notion entries");

        let mut summary = RelaySummary::default();
        for entry in &entries {
            let drive_url = self.mirror_attachment(entry).await;
            let payload = build_payload(entry, drive_url);
            match self.webhook.send(&payload).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    tracing::error!(page_id = %entry.id, error = %e, "Failed to relay entry");
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    async fn mirror_attachment(&self, entry: &NotionPage) -> Option<String> {
        let mirror = self.mirror.as_ref()?;
        let file = entry.first_file("File")?;
        match mirror.mirror(&file).await {
            Ok(link) => Some(link),
            Err(e) => {
                tracing::warn!(page_id = %entry.id, error = %e, "Attachment not mirrored");
                None
            }
        }
    }
}
