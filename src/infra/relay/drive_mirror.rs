use std::sync::Arc;

use async_trait::async_trait;

use crate::core::drive::{guess_mime, DriveApi};
use crate::core::notion::NotionFile;
use crate::core::relay::{FileMirror, RelayError};
use crate::core::storage::Downloader;

const FALLBACK_NAME: &str = "upload";

/// Downloads a Notion attachment to a temp file and re-uploads it to a
/// Drive folder. The temp file is removed when the guard drops.
pub struct DriveMirror<D: DriveApi> {
    drive: D,
    downloader: Arc<dyn Downloader>,
    folder_id: String,
}

impl<D: DriveApi> DriveMirror<D> {
    pub fn new(drive: D, downloader: Arc<dyn Downloader>, folder_id: impl Into<String>) -> Self {
        Self {
            drive,
            downloader,
            folder_id: folder_id.into(),
        }
    }
}

#[async_trait]
impl<D: DriveApi> FileMirror for DriveMirror<D> {
    async fn mirror(&self, file: &NotionFile) -> Result<String, RelayError> {
        let name = file.name.as_deref().unwrap_or(FALLBACK_NAME);
        let bytes = self
            .downloader
            .download(&file.url)
            .await
            .map_err(|e| RelayError::Mirror(e.to_string()))?;

        let temp = tempfile::NamedTempFile::new().map_err(|e| RelayError::Mirror(e.to_string()))?;
        tokio::fs::write(temp.path(), &bytes)
            .await
            .map_err(|e| RelayError::Mirror(e.to_string()))?;

        let uploaded = self
            .drive
            .upload_file(temp.path(), name, &self.folder_id, guess_mime(std::path::Path::new(name)))
            .await
            .map_err(|e| RelayError::Mirror(e.to_string()))?;

        tracing::info!(file = name, drive_id = %uploaded.id, "Mirrored attachment to Drive");
        Ok(uploaded
            .web_view_link
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", uploaded.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::drive::drive_service::testing::FakeDrive;
    use crate::core::storage::object_store::fake_downloads::CannedDownloads;

    #[tokio::test]
    async fn mirrors_download_into_configured_folder() {
        let downloads = CannedDownloads::default().with("https://files.notion.so/a.pdf", b"%PDF");
        let mirror = DriveMirror::new(FakeDrive::default(), Arc::new(downloads), "folder-1");

        let link = mirror
            .mirror(&NotionFile {
                name: Some("a.pdf".to_string()),
                url: "https://files.notion.so/a.pdf".to_string(),
            })
            .await
            .unwrap();

        assert!(link.contains("drive.google.com"));
        let uploads = mirror.drive.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].1, "a.pdf");
        assert_eq!(uploads[0].2, "folder-1");
    }

    #[tokio::test]
    async fn failed_download_is_a_mirror_error() {
        let mirror = DriveMirror::new(FakeDrive::default(), Arc::new(CannedDownloads::default()), "f");
        let err = mirror
            .mirror(&NotionFile {
                name: None,
                url: "https://missing".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Mirror(_)));
    }
}
