pub mod notion_relay;

pub use notion_relay::{
    FileMirror, NotionRelay, RelayConfig, RelayError, RelaySummary, WebhookPayload, WebhookSender,
};
