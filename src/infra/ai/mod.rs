pub mod gemini_client;
pub mod grok_client;
pub mod libretranslate_client;
pub mod openai_client;

pub use gemini_client::GeminiClient;
pub use grok_client::GrokClient;
pub use libretranslate_client::LibreTranslateClient;
pub use openai_client::OpenAiClient;
