//! logprep - Event Log Encoding Cache
//!
//! Encodes event logs into train/validation/test splits at most once per
//! parameter set and streams the results back as ZIP archives.

pub mod archive;
pub mod audit;
pub mod builder;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod encoding;
pub mod error;
pub mod http;
pub mod service;
pub mod ui;

pub use error::{LogprepError, LogprepResult};
