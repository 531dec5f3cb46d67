//! Error types.
//!
//! None of these ever escape `Engine::play`/`stop`/`update`: row problems are
//! collected into parse reports and fetch problems end a single load cycle.

use thiserror::Error;

/// Failure to obtain the text behind a locator.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("empty locator")]
    EmptyLocator,
    #[error("asset not found: {locator}")]
    NotFound { locator: String },
    #[error("failed to read {locator}: {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },
    #[error("request for {locator} failed: {reason}")]
    Http { locator: String, reason: String },
    #[error("no transport for {locator} (enable the `http` feature for network locators)")]
    UnsupportedScheme { locator: String },
    #[error("fetch worker for {locator} went away")]
    Disconnected { locator: String },
}

impl FetchError {
    /// Locator the failure refers to, when there is one.
    pub fn locator(&self) -> Option<&str> {
        match self {
            FetchError::EmptyLocator => None,
            FetchError::NotFound { locator }
            | FetchError::Io { locator, .. }
            | FetchError::Http { locator, .. }
            | FetchError::UnsupportedScheme { locator }
            | FetchError::Disconnected { locator } => Some(locator),
        }
    }
}

/// Errors produced while loading an `EngineConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config json parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
