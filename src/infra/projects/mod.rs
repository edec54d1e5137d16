pub mod sora_client;

pub use sora_client::SoraClient;
