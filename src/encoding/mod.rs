//! Encoding request model
//!
//! A request names an event log and carries partial properties; the service
//! merges them onto the dataset defaults and validates the result before
//! anything touches the cache.

pub mod properties;

pub use properties::{EncodingProperties, PropertyOverrides, WindowSize};

use crate::error::{LogprepError, LogprepResult};
use serde::{Deserialize, Serialize};

/// Inbound encode request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncodingRequest {
    /// Dataset directory name under the data root
    #[serde(rename = "event_log_name")]
    pub dataset_name: String,

    /// Properties set by the caller; the rest come from defaults
    #[serde(rename = "event_log_properties", default)]
    pub properties: PropertyOverrides,
}

impl EncodingRequest {
    /// Create a request with no property overrides
    pub fn new(dataset_name: impl Into<String>) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            properties: PropertyOverrides::default(),
        }
    }

    /// Attach property overrides
    pub fn with_properties(mut self, properties: PropertyOverrides) -> Self {
        self.properties = properties;
        self
    }
}

/// Reject dataset names that are not a single plain path component
///
/// The name becomes a directory under the data root, so separators and
/// dot-segments would escape it.
pub fn validate_dataset_name(name: &str) -> LogprepResult<()> {
    if name.is_empty() {
        return Err(LogprepError::invalid("event_log_name must not be empty"));
    }
    if name == "." || name == ".." || name.starts_with('.') {
        return Err(LogprepError::invalid(format!(
            "event_log_name {:?} must not start with '.'",
            name
        )));
    }
    if name.chars().any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control()) {
        return Err(LogprepError::invalid(format!(
            "event_log_name {:?} contains a path separator or control character",
            name
        )));
    }
    Ok(())
}
