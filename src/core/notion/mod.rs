pub mod markdown_meta;
pub mod notion_models;
pub mod notion_service;

pub use notion_models::{NotionError, NotionFile, NotionPage, Parent};
pub use notion_service::{BatchSummary, NotionApi, NotionConfig, NotionLogger, ProjectEntry};
