pub mod drive_mirror;
pub mod webhook_client;

pub use drive_mirror::DriveMirror;
pub use webhook_client::DiscordWebhook;
