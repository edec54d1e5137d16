use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::core::ai::{AiProvider, AiService};
use crate::core::config::{optional, require_all, ConfigError, EnvSource};
use crate::core::notion::notion_models::{number, page_request, rich_text, select, title, url};
use crate::core::notion::{NotionApi, NotionError, NotionLogger, Parent};

pub const PROJECTS_DB_TITLE: &str = "ClipOpera Projects";
pub const NOTES_MODEL: &str = "gpt-4";
pub const SORA_SYNC_URL: &str = "https://api.sora.ai/sync";
const PENAI_CODEX: &str = "PenAI Assistant";

#[derive(Debug, Error)]
pub enum SoraError {
    #[error("Sora returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Sora request failed: {0}")]
    Http(String),
}

#[derive(Debug, Clone)]
pub struct KickoffConfig {
    pub notion_token: String,
    pub database_id: String,
    pub openai_key: String,
    pub parent_page_id: Option<String>,
    pub sora_key: Option<String>,
}

impl KickoffConfig {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let [notion_token, database_id, openai_key]: [String; 3] =
            require_all(env, &["NOTION_TOKEN", "NOTION_DATABASE_ID", "OPENAI_API_KEY"])?
                .try_into()
                .map_err(|_| ConfigError::Missing("NOTION_TOKEN".to_string()))?;
        Ok(Self {
            notion_token,
            database_id,
            openai_key,
            parent_page_id: optional(env, "NOTION_PARENT_PAGE_ID"),
            sora_key: optional(env, "SORA_API_KEY"),
        })
    }

    pub fn parent_page(&self) -> Result<&str, ConfigError> {
        self.parent_page_id
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("NOTION_PARENT_PAGE_ID".to_string()))
    }

    pub fn sora_key(&self) -> Result<&str, ConfigError> {
        self.sora_key
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("SORA_API_KEY".to_string()))
    }
}

/// Kickoff arguments. Every field except `gpts` is required on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Kickoff {
    pub project: String,
    pub status: String,
    pub link: String,
    pub budget: f64,
    pub drive: String,
    pub webmaster: String,
    pub codex: String,
    pub gpts: String,
}

impl Kickoff {
    /// Comma-separated GPT ids, trimmed, blanks dropped.
    pub fn gpt_ids(&self) -> Vec<String> {
        self.gpts
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("Project".into(), title(&self.project));
        props.insert("Status".into(), select(&self.status));
        props.insert("Link".into(), url(&self.link));
        props.insert("Budget".into(), number(self.budget));
        props.insert("Drive Link".into(), url(&self.drive));
        props.insert("Webmaster".into(), rich_text(&self.webmaster));
        props.insert("Codex Assistant".into(), rich_text(&self.codex));
        props
    }

    pub fn sora_payload(&self) -> SoraPayload {
        SoraPayload {
            project: self.project.clone(),
            status: self.status.clone(),
            link: self.link.clone(),
            drive: self.drive.clone(),
            gpts: self.gpt_ids(),
        }
    }
}

/// `databases.create` body for the kickoff tracker.
pub fn projects_database_request(parent_page_id: &str) -> Value {
    json!({
        "parent": { "type": "page_id", "page_id": parent_page_id },
        "title": [{ "type": "text", "text": { "content": PROJECTS_DB_TITLE } }],
        "properties": {
            "Project": { "title": {} },
            "Status": {
                "select": {
                    "options": [
                        { "name": "In Production", "color": "yellow" },
                        { "name": "In Queue", "color": "blue" },
                        { "name": "Complete", "color": "green" }
                    ]
                }
            },
            "Link": { "url": {} },
            "Budget": { "number": { "format": "dollar" } },
            "Drive Link": { "url": {} },
            "Webmaster": { "rich_text": {} },
            "Codex Assistant": { "rich_text": {} }
        }
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoraPayload {
    pub project: String,
    pub status: String,
    pub link: String,
    pub drive: String,
    pub gpts: Vec<String>,
}

#[async_trait]
pub trait SoraSync: Send + Sync {
    async fn sync(&self, payload: &SoraPayload) -> Result<(), SoraError>;
}

/// What the codex step decided to do. Only one assistant has a routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodexAction {
    RouteEdits { project: String, status: String },
    NoneDefined,
}

pub fn codex_autocommand(codex: &str, project: &str, status: &str) -> CodexAction {
    tracing::info!(codex, "Codex is analyzing");
    if codex == PENAI_CODEX {
        tracing::info!(project, status, "PenAI routing editing instructions");
        CodexAction::RouteEdits {
            project: project.to_string(),
            status: status.to_string(),
        }
    } else {
        tracing::warn!("No codex autocommand defined.");
        CodexAction::NoneDefined
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GptNote {
    pub gpt_id: String,
    pub notes: String,
}

#[derive(Debug, Default)]
pub struct KickoffReport {
    pub database_id: Option<String>,
    pub page_id: String,
    pub notes: Vec<GptNote>,
    pub failed_gpts: Vec<String>,
    pub codex: Option<CodexAction>,
    pub sora_synced: Option<bool>,
}

pub struct ProjectKickoff<N: NotionApi, P: AiProvider> {
    notion: NotionLogger<N>,
    ai: AiService<P>,
    sora: Option<Box<dyn SoraSync>>,
}

impl<N: NotionApi, P: AiProvider> ProjectKickoff<N, P> {
    pub fn new(notion: NotionLogger<N>, ai: AiService<P>, sora: Option<Box<dyn SoraSync>>) -> Self {
        Self { notion, ai, sora }
    }

    pub async fn create_database(&self, parent_page_id: &str) -> Result<String, NotionError> {
        let id = self
            .notion
            .create_database(&projects_database_request(parent_page_id))
            .await?;
        tracing::info!(database_id = %id, "Created project database");
        Ok(id)
    }

    pub async fn log_row(&self, database_id: &str, kickoff: &Kickoff) -> Result<String, NotionError> {
        let body = page_request(
            &Parent::Database(database_id.to_string()),
            kickoff.properties(),
            Vec::new(),
        );
        let page = self.notion.api().create_page(&body).await?;
        tracing::info!(project = %kickoff.project, page_id = %page.id, "Project logged in Notion");
        Ok(page.id)
    }

    /// Production notes per GPT id. A failing id is logged and skipped.
    pub async fn gpt_notes(&self, kickoff: &Kickoff) -> (Vec<GptNote>, Vec<String>) {
        let mut notes = Vec::new();
        let mut failed = Vec::new();
        for gpt_id in kickoff.gpt_ids() {
            match self.ai.production_notes(&gpt_id, NOTES_MODEL).await {
                Ok(text) => {
                    tracing::info!(gpt_id = %gpt_id, notes = %text, "GPT output");
                    notes.push(GptNote { gpt_id, notes: text });
                }
                Err(e) => {
                    tracing::warn!(gpt_id = %gpt_id, error = %e, "GPT failure");
                    failed.push(gpt_id);
                }
            }
        }
        (notes, failed)
    }

    /// Runs the whole kickoff. Only the Notion steps can fail it; GPT and
    /// Sora problems end up in the report.
    pub async fn run(
        &self,
        database_id: &str,
        kickoff: &Kickoff,
        create_db_under: Option<&str>,
    ) -> Result<KickoffReport, NotionError> {
        let mut report = KickoffReport::default();
        if let Some(parent) = create_db_under {
            report.database_id = Some(self.create_database(parent).await?);
        }

        report.page_id = self.log_row(database_id, kickoff).await?;

        if !kickoff.gpts.trim().is_empty() {
            let (notes, failed) = self.gpt_notes(kickoff).await;
            report.notes = notes;
            report.failed_gpts = failed;
        }

        report.codex = Some(codex_autocommand(
            &kickoff.codex,
            &kickoff.project,
            &kickoff.status,
        ));

        if let Some(sora) = &self.sora {
            let synced = match sora.sync(&kickoff.sora_payload()).await {
                Ok(()) => {
                    tracing::info!("Sora synced");
                    true
                }
                Err(e) => {
                    tracing::error!(error = %e, "Sora sync failed");
                    false
                }
            };
            report.sora_synced = Some(synced);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::{AiConfig, AiError, AiMessage};
    use crate::core::config::MapEnv;
    use crate::core::notion::notion_service::testing::FakeNotion;
    use std::sync::{Arc, Mutex};

    struct PickyAi;

    #[async_trait]
    impl AiProvider for PickyAi {
        async fn chat_complete(&self, messages: &[AiMessage], config: &AiConfig) -> Result<String, AiError> {
            assert_eq!(config.model, NOTES_MODEL);
            if messages[0].content.contains("broken") {
                return Err(AiError::Http("timeout".to_string()));
            }
            Ok(format!("notes from {}", messages[0].content))
        }
    }

    #[derive(Default, Clone)]
    struct RecordingSora {
        sent: Arc<Mutex<Vec<SoraPayload>>>,
        fail: bool,
    }

    #[async_trait]
    impl SoraSync for RecordingSora {
        async fn sync(&self, payload: &SoraPayload) -> Result<(), SoraError> {
            self.sent.lock().unwrap().push(payload.clone());
            if self.fail {
                return Err(SoraError::Http("dns".to_string()));
            }
            Ok(())
        }
    }

    fn kickoff(gpts: &str) -> Kickoff {
        Kickoff {
            project: "Opera Teaser".to_string(),
            status: "In Queue".to_string(),
            link: "https://clipopera.com/teaser".to_string(),
            budget: 2500.0,
            drive: "https://drive.google.com/teaser".to_string(),
            webmaster: "Rae".to_string(),
            codex: "PenAI Assistant".to_string(),
            gpts: gpts.to_string(),
        }
    }

    #[test]
    fn database_schema_has_status_options_and_dollar_budget() {
        let body = projects_database_request("parent-1");
        assert_eq!(body["parent"]["page_id"], "parent-1");
        assert_eq!(body["title"][0]["text"]["content"], PROJECTS_DB_TITLE);
        let options = &body["properties"]["Status"]["select"]["options"];
        assert_eq!(options[0]["name"], "In Production");
        assert_eq!(options[0]["color"], "yellow");
        assert_eq!(options[2]["color"], "green");
        assert_eq!(body["properties"]["Budget"]["number"]["format"], "dollar");
    }

    #[test]
    fn kickoff_row_uses_select_status() {
        let props = kickoff("").properties();
        assert_eq!(props["Project"]["title"][0]["text"]["content"], "Opera Teaser");
        assert_eq!(props["Status"]["select"]["name"], "In Queue");
        assert_eq!(props["Drive Link"]["url"], "https://drive.google.com/teaser");
        assert_eq!(props["Codex Assistant"]["rich_text"][0]["text"]["content"], "PenAI Assistant");
    }

    #[test]
    fn codex_routine_only_for_penai() {
        assert_eq!(
            codex_autocommand("PenAI Assistant", "p", "s"),
            CodexAction::RouteEdits {
                project: "p".into(),
                status: "s".into()
            }
        );
        assert_eq!(codex_autocommand("Other", "p", "s"), CodexAction::NoneDefined);
    }

    #[test]
    fn optional_keys_are_checked_on_use() {
        let env = MapEnv::new()
            .with("NOTION_TOKEN", "t")
            .with("NOTION_DATABASE_ID", "db")
            .with("OPENAI_API_KEY", "k");
        let config = KickoffConfig::from_env(&env).unwrap();
        assert_eq!(
            config.sora_key().unwrap_err(),
            ConfigError::Missing("SORA_API_KEY".to_string())
        );
        assert!(config.parent_page().is_err());

        assert_eq!(
            KickoffConfig::from_env(&MapEnv::new().with("NOTION_TOKEN", "t")).unwrap_err(),
            ConfigError::MissingMany(vec![
                "NOTION_DATABASE_ID".to_string(),
                "OPENAI_API_KEY".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn gpt_failures_do_not_stop_the_kickoff() {
        let sora = RecordingSora::default();
        let runner = ProjectKickoff::new(
            NotionLogger::new(FakeNotion::default()),
            AiService::new(PickyAi),
            Some(Box::new(sora.clone())),
        );

        let report = runner
            .run("db-9", &kickoff("writer, broken ,editor"), Some("parent-1"))
            .await
            .unwrap();

        assert_eq!(report.database_id.as_deref(), Some("db-1"));
        assert_eq!(report.notes.len(), 2);
        assert_eq!(report.notes[1].gpt_id, "editor");
        assert_eq!(report.failed_gpts, vec!["broken".to_string()]);
        assert_eq!(report.sora_synced, Some(true));
        let sent = sora.sent.lock().unwrap();
        assert_eq!(sent[0].gpts, vec!["writer", "broken", "editor"]);
    }

    #[tokio::test]
    async fn sora_failure_is_reported_not_raised() {
        let sora = RecordingSora {
            fail: true,
            ..Default::default()
        };
        let runner = ProjectKickoff::new(
            NotionLogger::new(FakeNotion::default()),
            AiService::new(PickyAi),
            Some(Box::new(sora)),
        );
        let report = runner.run("db-9", &kickoff(""), None).await.unwrap();
        assert!(report.database_id.is_none());
        assert!(report.notes.is_empty());
        assert_eq!(report.sora_synced, Some(false));
    }

    #[tokio::test]
    async fn notion_failure_aborts() {
        let notion = FakeNotion {
            fail_create_containing: Some("Opera Teaser".to_string()),
            ..Default::default()
        };
        let runner = ProjectKickoff::new(NotionLogger::new(notion), AiService::new(PickyAi), None);
        assert!(runner.run("db-9", &kickoff("writer"), None).await.is_err());
    }
}
