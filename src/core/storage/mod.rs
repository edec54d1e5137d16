pub mod object_store;

pub use object_store::{
    public_url, upload_placeholders, Downloader, ObjectStore, PlaceholderSummary, S3Config, StorageError,
    S3_VARS,
};
