use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::markdown_meta::parse_markdown_meta;
use crate::core::config::{optional, require, ConfigError, EnvSource};
use super::notion_models::{
    multi_select, number, page_request, paragraph_block, rich_text, select, title, url,
    NotionError, NotionPage, Parent,
};

/// The Notion REST calls the pipelines need.
#[async_trait]
pub trait NotionApi: Send + Sync {
    async fn create_page(&self, body: &Value) -> Result<NotionPage, NotionError>;
    async fn query_database(
        &self,
        database_id: &str,
        query: &Value,
    ) -> Result<Vec<NotionPage>, NotionError>;
    async fn update_page(&self, page_id: &str, properties: &Value) -> Result<(), NotionError>;
    /// Returns the id of the new database.
    async fn create_database(&self, body: &Value) -> Result<String, NotionError>;
}

/// One project row in the tracking database.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProjectEntry {
    pub project: String,
    pub status: String,
    pub link: String,
    pub budget: i64,
    #[serde(default)]
    pub drive: Option<String>,
    #[serde(default)]
    pub webmaster: Option<String>,
    #[serde(default)]
    pub codex: Option<String>,
    #[serde(default)]
    pub gpts: Option<String>,
    #[serde(default)]
    pub library: Option<String>,
    #[serde(default)]
    pub registry: Option<String>,
}

impl ProjectEntry {
    pub fn properties(&self) -> Map<String, Value> {
        let mut props = Map::new();
        props.insert("Name".into(), title(&self.project));
        props.insert("Status".into(), rich_text(&self.status));
        props.insert("Link".into(), url(&self.link));
        props.insert("Budget".into(), number(self.budget as f64));

        if let Some(drive) = non_empty(&self.drive) {
            props.insert("Drive".into(), url(drive));
        }
        let optional_text = [
            ("Webmaster", &self.webmaster),
            ("Codex", &self.codex),
            ("GPTs", &self.gpts),
            ("Library", &self.library),
            ("Registry", &self.registry),
        ];
        for (name, value) in optional_text {
            if let Some(value) = non_empty(value) {
                props.insert(name.into(), rich_text(value));
            }
        }
        props
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Tally for the batch uploads. Failures are logged, never fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub uploaded: usize,
    pub failed: usize,
}

/// Properties for a Markdown note going into a content database.
pub fn markdown_properties(file_name: &str, content: &str) -> Map<String, Value> {
    let meta = parse_markdown_meta(content);
    let mut props = Map::new();
    props.insert("Name".into(), title(file_name));
    if !meta.tags.is_empty() {
        props.insert("Tags".into(), multi_select(&meta.tags));
    }
    if !meta.topics.is_empty() {
        props.insert("Topics".into(), multi_select(&meta.topics));
    }
    if let Some(quote) = meta.quote {
        props.insert("Quote".into(), rich_text(&quote));
    }
    props
}

/// `NOTION_TOKEN` plus the default database and parent page, either of which
/// a command-line flag may override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: Option<String>,
    pub parent_page_id: Option<String>,
}

impl NotionConfig {
    pub fn from_env(env: &dyn EnvSource) -> Result<Self, ConfigError> {
        Ok(Self {
            token: require(env, "NOTION_TOKEN")?,
            database_id: optional(env, "NOTION_DATABASE_ID"),
            parent_page_id: optional(env, "NOTION_PARENT_PAGE_ID"),
        })
    }

    pub fn database(&self, flag: Option<String>) -> Result<String, ConfigError> {
        flag.or_else(|| self.database_id.clone())
            .ok_or_else(|| ConfigError::Missing("NOTION_DATABASE_ID".to_string()))
    }

    pub fn parent_page(&self, flag: Option<String>) -> Result<String, ConfigError> {
        flag.or_else(|| self.parent_page_id.clone())
            .ok_or_else(|| ConfigError::Missing("NOTION_PARENT_PAGE_ID".to_string()))
    }
}

/// Notion-backed project and content logging.
pub struct NotionLogger<N: NotionApi> {
    api: N,
}

impl<N: NotionApi> NotionLogger<N> {
    pub fn new(api: N) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &N {
        &self.api
    }

    pub async fn log_project(
        &self,
        database_id: &str,
        entry: &ProjectEntry,
    ) -> Result<NotionPage, NotionError> {
        let body = page_request(
            &Parent::Database(database_id.to_string()),
            entry.properties(),
            Vec::new(),
        );
        let page = self.api.create_page(&body).await?;
        tracing::info!(project = %entry.project, page_id = %page.id, "Notion project page created");
        Ok(page)
    }

    /// Creates a child page whose body is the given Markdown text.
    pub async fn send_markdown(
        &self,
        parent_page_id: &str,
        page_title: &str,
        content: &str,
    ) -> Result<NotionPage, NotionError> {
        let mut props = Map::new();
        props.insert("title".into(), title(page_title));
        let body = page_request(
            &Parent::Page(parent_page_id.to_string()),
            props,
            vec![paragraph_block(content)],
        );
        self.api.create_page(&body).await
    }

    /// Uploads every `.md` file in `dir` as a database row. Unreadable files and
    /// API failures are logged and skipped.
    pub async fn upload_markdown_dir(&self, database_id: &str, dir: &Path) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let files = match markdown_files(dir).await {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "Failed to list Markdown files");
                return summary;
            }
        };

        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Skipping unreadable file");
                    summary.failed += 1;
                    continue;
                }
            };

            let body = page_request(
                &Parent::Database(database_id.to_string()),
                markdown_properties(&file_name, &content),
                vec![paragraph_block(&content)],
            );
            match self.api.create_page(&body).await {
                Ok(page) => {
                    tracing::info!(
                        file = %file_name,
                        url = page.url.as_deref().unwrap_or(""),
                        "Uploaded Markdown note"
                    );
                    summary.uploaded += 1;
                }
                Err(e) => {
                    tracing::error!(file = %file_name, error = %e, "Failed to create page");
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// One project per non-blank JSONL line.
    pub async fn upload_project_batch(&self, database_id: &str, jsonl: &str) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for (index, line) in jsonl.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry: ProjectEntry = match serde_json::from_str(line) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(line = index + 1, error = %e, "Skipping malformed project line");
                    summary.failed += 1;
                    continue;
                }
            };
            match self.log_project(database_id, &entry).await {
                Ok(_) => summary.uploaded += 1,
                Err(e) => {
                    tracing::error!(project = %entry.project, error = %e, "Failed to log project");
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    pub async fn create_database(&self, body: &Value) -> Result<String, NotionError> {
        self.api.create_database(body).await
    }

    pub async fn query(&self, database_id: &str, query: &Value) -> Result<Vec<NotionPage>, NotionError> {
        self.api.query_database(database_id, query).await
    }

    pub async fn set_status(&self, page_id: &str, status: &str) -> Result<(), NotionError> {
        self.api
            .update_page(page_id, &json!({ "Status": select(status) }))
            .await
    }
}

async fn markdown_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_md = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("md"))
            .unwrap_or(false);
        if is_md && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}


#[cfg(test)]
mod tests {
    use super::testing::FakeNotion;
    use super::*;
    use crate::core::config::MapEnv;

    #[test]
    fn config_needs_a_token_and_prefers_flags() {
        assert_eq!(
            NotionConfig::from_env(&MapEnv::new().with("NOTION_DATABASE_ID", "db")).unwrap_err(),
            ConfigError::Missing("NOTION_TOKEN".to_string())
        );

        let config = NotionConfig::from_env(
            &MapEnv::new()
                .with("NOTION_TOKEN", "secret")
                .with("NOTION_DATABASE_ID", "db-env"),
        )
        .unwrap();
        assert_eq!(config.database(None).unwrap(), "db-env");
        assert_eq!(config.database(Some("db-flag".into())).unwrap(), "db-flag");
        assert_eq!(
            config.parent_page(None),
            Err(ConfigError::Missing("NOTION_PARENT_PAGE_ID".to_string()))
        );
    }

    fn entry() -> ProjectEntry {
        ProjectEntry {
            project: "Launch".to_string(),
            status: "In Queue".to_string(),
            link: "https://example.com".to_string(),
            budget: 1200,
            drive: Some("https://drive.google.com/x".to_string()),
            webmaster: None,
            codex: Some("PenAI Assistant".to_string()),
            gpts: Some(String::new()),
            library: None,
            registry: None,
        }
    }

    #[test]
    fn project_properties_include_only_present_optionals() {
        let props = entry().properties();
        assert_eq!(props["Name"]["title"][0]["text"]["content"], "Launch");
        assert_eq!(props["Status"]["rich_text"][0]["text"]["content"], "In Queue");
        assert_eq!(props["Budget"]["number"], 1200.0);
        assert_eq!(props["Drive"]["url"], "https://drive.google.com/x");
        assert!(props.contains_key("Codex"));
        assert!(!props.contains_key("Webmaster"));
        // blank strings are treated as absent
        assert!(!props.contains_key("GPTs"));
    }

    #[test]
    fn markdown_properties_skip_empty_metadata() {
        let props = markdown_properties("note.md", "no metadata here");
        assert_eq!(props.len(), 1);
        assert!(props.contains_key("Name"));

        let props = markdown_properties("note.md", "tags: a b\n### Quote\n\"q\"");
        assert_eq!(props["Tags"]["multi_select"][1]["name"], "b");
        assert_eq!(props["Quote"]["rich_text"][0]["text"]["content"], "q");
    }

    #[tokio::test]
    async fn project_batch_continues_past_bad_lines() {
        let fake = FakeNotion {
            fail_create_containing: Some("Broken".to_string()),
            ..Default::default()
        };
        let logger = NotionLogger::new(fake);
        let jsonl = r#"{"project":"One","status":"New","link":"https://a","budget":1}

not json
{"project":"Broken","status":"New","link":"https://b","budget":2}
{"project":"Three","status":"New","link":"https://c","budget":3,"sora":"yes"}
"#;

        let summary = logger.upload_project_batch("db", jsonl).await;
        assert_eq!(summary, BatchSummary { uploaded: 2, failed: 2 });
        let created = logger.api().created.lock().unwrap();
        assert_eq!(created[0]["parent"]["database_id"], "db");
    }

    #[tokio::test]
    async fn markdown_dir_uploads_only_md_files() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("b.md"), "tags: x").await.unwrap();
        tokio::fs::write(dir.path().join("a.MD"), "hello").await.unwrap();
        tokio::fs::write(dir.path().join("skip.txt"), "nope").await.unwrap();

        let logger = NotionLogger::new(FakeNotion::default());
        let summary = logger.upload_markdown_dir("db", dir.path()).await;

        assert_eq!(summary, BatchSummary { uploaded: 2, failed: 0 });
        let created = logger.api().created.lock().unwrap();
        assert_eq!(
            created[0]["properties"]["Name"]["title"][0]["text"]["content"],
            "a.MD"
        );
        assert_eq!(
            created[0]["children"][0]["paragraph"]["rich_text"][0]["text"]["content"],
            "hello"
        );
    }

    #[tokio::test]
    async fn send_markdown_targets_parent_page() {
        let logger = NotionLogger::new(FakeNotion::default());
        logger.send_markdown("parent", "Title", "# body").await.unwrap();

        let created = logger.api().created.lock().unwrap();
        assert_eq!(created[0]["parent"]["page_id"], "parent");
        assert_eq!(
            created[0]["properties"]["title"]["title"][0]["text"]["content"],
            "Title"
        );
    }
}
