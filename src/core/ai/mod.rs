pub mod ai_service;
pub mod chat_router;
pub mod models;

pub use ai_service::{AiProvider, AiService, ImageGenerator, Translator};
pub use chat_router::ChatRouter;
pub use models::{AdCopy, AdCopyRequest, AiConfig, AiError, AiMessage, ImageRequest};
