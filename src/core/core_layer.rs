// The core module contains all business logic.
// Each pipeline gets its own submodule; vendor HTTP lives behind traits
// that `infra/` implements.

#[path = "config/env_config.rs"]
pub mod config;

#[path = "notion/mod.rs"]
pub mod notion;

#[path = "prompts/prompt_relay.rs"]
pub mod prompts;

#[path = "relay/mod.rs"]
pub mod relay;

#[path = "reddit/cross_poster.rs"]
pub mod reddit;

#[path = "drive/mod.rs"]
pub mod drive;

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "storage/mod.rs"]
pub mod storage;

#[path = "ads/mod.rs"]
pub mod ads;

#[path = "jobs/mod.rs"]
pub mod jobs;

#[path = "accounts/mod.rs"]
pub mod accounts;

#[path = "commerce/mod.rs"]
pub mod commerce;

#[path = "totango/mod.rs"]
pub mod totango;

#[path = "projects/mod.rs"]
pub mod projects;
