//! Configuration schema for logprep
//!
//! Configuration is stored at `~/.config/logprep/config.toml`

use crate::archive::DEFAULT_CHUNK_SIZE;
use crate::encoding::EncodingProperties;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Dataset and artifact storage
    pub storage: StorageConfig,

    /// External encoder
    pub encoder: EncoderConfig,

    /// Global encoding property defaults
    pub defaults: EncodingProperties,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root holding one directory per dataset
    pub data_dir: PathBuf,

    /// Extension of artifact files
    pub artifact_extension: String,

    /// Read size when streaming archives, in bytes
    pub chunk_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            artifact_extension: "pkl".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Encoder configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Program and arguments; empty disables building
    pub command: Vec<String>,
}
