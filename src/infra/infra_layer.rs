// The infra module contains implementations of core traits.
// Each external service gets its own submodule.

pub mod retry;

#[path = "notion/mod.rs"]
pub mod notion;

#[path = "relay/mod.rs"]
pub mod relay;

#[path = "reddit/mod.rs"]
pub mod reddit;

#[path = "google/mod.rs"]
pub mod google;

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "media/mod.rs"]
pub mod media;

#[path = "meta/mod.rs"]
pub mod meta;

#[path = "commerce/mod.rs"]
pub mod commerce;

#[path = "totango/mod.rs"]
pub mod totango;

#[path = "projects/mod.rs"]
pub mod projects;

#[path = "accounts/mod.rs"]
pub mod accounts;
