//! TUT-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, TutorError>;

/// Top-level error type for the tutor.
///
/// Malformed history lines are not represented here: they are data, reported
/// per line through [`crate::history::record::LineError`].
#[derive(Debug, Error)]
pub enum TutorError {
    #[error("[TUT-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[TUT-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[TUT-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[TUT-1004] API key not found in environment variable {var}")]
    MissingApiKey { var: String },

    #[error("[TUT-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[TUT-2201] chart rendering failed: {details}")]
    Chart { details: String },

    #[error("[TUT-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[TUT-4001] model rate limited the request{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    #[error("[TUT-4002] model API failure{}: {message}", status_suffix(.status))]
    ModelApi {
        status: Option<u16>,
        message: String,
    },

    #[error("[TUT-4003] model returned no text: {details}")]
    EmptyResponse { details: String },

    #[error("[TUT-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl TutorError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "TUT-1001",
            Self::MissingConfig { .. } => "TUT-1002",
            Self::ConfigParse { .. } => "TUT-1003",
            Self::MissingApiKey { .. } => "TUT-1004",
            Self::Serialization { .. } => "TUT-2101",
            Self::Chart { .. } => "TUT-2201",
            Self::Io { .. } => "TUT-3002",
            Self::RateLimited { .. } => "TUT-4001",
            Self::ModelApi { .. } => "TUT-4002",
            Self::EmptyResponse { .. } => "TUT-4003",
            Self::Runtime { .. } => "TUT-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Only rate limiting is transient; everything else the model boundary
    /// reports is treated as fatal for the current query.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[allow(clippy::ref_option)]
fn retry_after_suffix(retry_after: &Option<Duration>) -> String {
    retry_after.map_or_else(String::new, |d| {
        format!(" (retry after {}s)", d.as_secs())
    })
}

#[allow(clippy::ref_option)]
fn status_suffix(status: &Option<u16>) -> String {
    status.map_or_else(String::new, |s| format!(" (HTTP {s})"))
}

impl From<serde_json::Error> for TutorError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for TutorError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for TutorError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}
