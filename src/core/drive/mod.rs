pub mod drive_service;

pub use drive_service::{
    folder_query, guess_mime, library_folder_id, openai_key, write_manifest, ChatUploadSummary, ChatUploader, DriveApi, DriveError, DriveFile,
    LibraryUploader, ManifestEntry, DRY_RUN_ID, FOLDER_MIME, MANIFEST_FILE,
};
