//! Error types for logprep
//!
//! All modules use `LogprepResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for logprep operations
pub type LogprepResult<T> = Result<T, LogprepError>;

/// All errors that can occur in logprep
#[derive(Error, Debug)]
pub enum LogprepError {
    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Event log not found: {0}")]
    DatasetNotFound(String),

    // Build errors
    #[error("Build failed for {dataset}: {reason}")]
    BuildFailed { dataset: String, reason: String },

    #[error("No encoder command configured")]
    EncoderNotConfigured,

    #[error("Encoder exited with {status}: {stderr}")]
    EncoderFailed { status: String, stderr: String },

    // Store errors
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl LogprepError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid request error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest(reason.into())
    }

    /// Create a build failure error
    pub fn build_failed(dataset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BuildFailed {
            dataset: dataset.into(),
            reason: reason.into(),
        }
    }


    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::EncoderNotConfigured => {
                Some("Set [encoder] command in the config file, e.g. command = [\"python3\", \"encode.py\"]")
            }
            Self::BuildFailed { .. } => Some("Check [encoder] command in the config; run with -vv for details"),
            Self::DatasetNotFound(_) => Some("Run: logprep datasets"),
            Self::ConfigInvalid { .. } => Some("Run: logprep config path"),
            _ => None,
        }
    }
}
