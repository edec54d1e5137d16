// Configuration lookup shared by every pipeline.
//
// Pipelines never read `std::env` directly. They take an `EnvSource` so the
// "fail before any network call" rule can be tested with a plain map.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    Missing(String),
    #[error("Missing environment variables: {}", .0.join(", "))]
    MissingMany(Vec<String>),
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Anything that can answer "what is the value of this variable?".
pub trait EnvSource: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads the real process environment (after `.env` has been loaded).
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed set of variables, used by tests and by callers that build config by hand.
#[derive(Debug, Default, Clone)]
pub struct MapEnv {
    values: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }
}

impl EnvSource for MapEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Value of `name`, treating blank strings the same as unset.
pub fn optional(env: &dyn EnvSource, name: &str) -> Option<String> {
    env.get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn require(env: &dyn EnvSource, name: &str) -> Result<String, ConfigError> {
    optional(env, name).ok_or_else(|| ConfigError::Missing(name.to_string()))
}

/// Resolve every name at once so the error lists all missing variables, not just the first.
pub fn require_all(env: &dyn EnvSource, names: &[&str]) -> Result<Vec<String>, ConfigError> {
    let mut values = Vec::with_capacity(names.len());
    let mut missing = Vec::new();

    for name in names {
        match optional(env, name) {
            Some(value) => values.push(value),
            None => missing.push(name.to_string()),
        }
    }

    match missing.len() {
        0 => Ok(values),
        1 => Err(ConfigError::Missing(missing.remove(0))),
        _ => Err(ConfigError::MissingMany(missing)),
    }
}

/// Logs SET / MISSING for each variable without ever printing the value.
pub fn log_presence(env: &dyn EnvSource, names: &[&str]) {
    for name in names {
        let state = if optional(env, name).is_some() {
            "SET"
        } else {
            "MISSING"
        };
        tracing::info!(variable = *name, state, "Environment check");
    }
}
