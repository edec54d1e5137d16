use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::ai::{AiProvider, AiService};
use crate::core::config::{optional, ConfigError, EnvSource};

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const DRY_RUN_ID: &str = "DRY-RUN";
pub const MANIFEST_FILE: &str = "upload_manifest.json";

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Google auth failed: {0}")]
    Auth(String),
    #[error("Drive API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Drive request failed: {0}")]
    Http(String),
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

#[async_trait]
pub trait DriveApi: Send + Sync {
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<String>, DriveError>;
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String, DriveError>;
    async fn upload_file(
        &self,
        path: &Path,
        name: &str,
        parent_id: &str,
        mime_type: &str,
    ) -> Result<DriveFile, DriveError>;
}

/// Drive search query for a non-trashed folder called `name` under `parent_id`.
pub fn folder_query(name: &str, parent_id: &str) -> String {
    let name = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "'{parent_id}' in parents and name = '{name}' and mimeType = '{FOLDER_MIME}' and trashed = false"
    )
}

pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "md" | "markdown" => "text/markdown",
        "jsonl" => "application/jsonl",
        _ => mime_guess::from_ext(&ext)
            .first_raw()
            .unwrap_or("application/octet-stream"),
    }
}

/// `--folder-id`, else `DRIVE_ROOT_FOLDER_ID`, else `DRIVE_FOLDER_ID`.
pub fn library_folder_id(flag: Option<String>, env: &dyn EnvSource) -> Result<String, ConfigError> {
    flag.filter(|f| !f.trim().is_empty())
        .or_else(|| optional(env, "DRIVE_ROOT_FOLDER_ID"))
        .or_else(|| optional(env, "DRIVE_FOLDER_ID"))
        .ok_or_else(|| ConfigError::Missing("DRIVE_ROOT_FOLDER_ID".to_string()))
}

pub fn openai_key(flag: Option<String>, env: &dyn EnvSource) -> Result<String, ConfigError> {
    flag.filter(|f| !f.trim().is_empty())
        .or_else(|| optional(env, "OPENAI_API_KEY"))
        .ok_or_else(|| ConfigError::Missing("OPENAI_API_KEY".to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    pub drive_id: String,
}

/// Mirrors a local directory tree into Drive, creating folders as needed.
pub struct LibraryUploader<D: DriveApi> {
    drive: D,
    folder_cache: HashMap<(String, String), String>,
}

impl<D: DriveApi> LibraryUploader<D> {
    pub fn new(drive: D) -> Self {
        Self {
            drive,
            folder_cache: HashMap::new(),
        }
    }

    /// Resolves `relative_dir` below `root_id` to a Drive folder id.
    pub async fn resolve_folder(
        &mut self,
        relative_dir: &Path,
        root_id: &str,
    ) -> Result<String, DriveError> {
        let mut parent = root_id.to_string();
        for segment in path_segments(relative_dir) {
            let key = (segment.clone(), parent.clone());
            if let Some(id) = self.folder_cache.get(&key) {
                parent = id.clone();
                continue;
            }

            let id = match self.drive.find_folder(&segment, &parent).await? {
                Some(id) => id,
                None => {
                    tracing::info!(folder = %segment, parent = %parent, "Creating Drive folder");
                    self.drive.create_folder(&segment, &parent).await?
                }
            };
            self.folder_cache.insert(key, id.clone());
            parent = id;
        }
        Ok(parent)
    }

    /// Uploads every file below `local_root`. In dry-run mode nothing touches
    /// Drive and every entry gets the `DRY-RUN` id.
    pub async fn upload_tree(
        &mut self,
        local_root: &Path,
        root_id: &str,
        dry_run: bool,
    ) -> Result<Vec<ManifestEntry>, DriveError> {
        let mut manifest = Vec::new();

        for entry in walkdir::WalkDir::new(local_root).sort_by_file_name() {
            let entry = entry.map_err(|e| DriveError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let relative = path.strip_prefix(local_root).unwrap_or(path);
            let rel_display = relative.to_string_lossy().to_string();

            if dry_run {
                tracing::info!(file = %rel_display, "[DRY-RUN] Would upload");
                manifest.push(ManifestEntry {
                    file: rel_display,
                    drive_id: DRY_RUN_ID.to_string(),
                });
                continue;
            }

            let parent_dir = relative.parent().unwrap_or_else(|| Path::new(""));
            let parent_id = self.resolve_folder(parent_dir, root_id).await?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| rel_display.clone());

            let uploaded = self
                .drive
                .upload_file(path, &name, &parent_id, guess_mime(path))
                .await?;
            tracing::info!(file = %rel_display, drive_id = %uploaded.id, "Uploaded to Drive");
            manifest.push(ManifestEntry {
                file: rel_display,
                drive_id: uploaded.id,
            });
        }

        Ok(manifest)
    }
}

fn path_segments(dir: &Path) -> Vec<String> {
    dir.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

pub async fn write_manifest(path: &Path, manifest: &[ManifestEntry]) -> Result<(), DriveError> {
    let json =
        serde_json::to_string_pretty(manifest).map_err(|e| DriveError::Io(e.into()))?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatUploadSummary {
    pub uploaded: usize,
    pub summarized: usize,
    pub failed: usize,
}

/// Uploads Markdown chat logs, logging an AI summary of each first.
pub struct ChatUploader<D: DriveApi, P: AiProvider> {
    drive: D,
    ai: AiService<P>,
}

impl<D: DriveApi, P: AiProvider> ChatUploader<D, P> {
    pub fn new(drive: D, ai: AiService<P>) -> Self {
        Self { drive, ai }
    }

    pub async fn upload_dir(&self, dir: &Path, folder_id: &str) -> Result<ChatUploadSummary, DriveError> {
        let mut summary = ChatUploadSummary::default();

        for path in chat_files(dir).await? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Skipping unreadable chat log");
                    summary.failed += 1;
                    continue;
                }
            };

            match self.ai.summarize_chat(&content).await {
                Ok(text) => {
                    tracing::info!(file = %name, summary = %text, "Chat summary");
                    summary.summarized += 1;
                }
                Err(e) => tracing::warn!(file = %name, error = %e, "ChatGPT summary failed"),
            }

            match self
                .drive
                .upload_file(&path, &name, folder_id, "text/markdown")
                .await
            {
                Ok(file) => {
                    tracing::info!(file = %name, drive_id = %file.id, "Uploaded chat log");
                    summary.uploaded += 1;
                }
                Err(e) => {
                    tracing::error!(file = %name, error = %e, "Chat upload failed");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }
}

async fn chat_files(dir: &Path) -> Result<Vec<PathBuf>, DriveError> {
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
