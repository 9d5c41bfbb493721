//! Cache entry state
//!
//! Groups the committed artifacts sharing one key and reports whether the
//! group is complete (a cache hit) or partial (left over from an interrupted
//! build; the next request rebuilds it).

use crate::cache::fingerprint::Fingerprint;
use crate::cache::store::ArtifactKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Name of the per-dataset directory holding encoded artifacts
pub const ENCODED_DIR: &str = "encoded";

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// State of a cache entry on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// All three artifacts present
    Complete,
    /// Some artifacts missing
    Partial,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// Artifacts on disk sharing (result name, min suffix, fingerprint)
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub dataset: String,
    pub result_name: String,
    pub min_suffix: u32,
    pub fingerprint: Fingerprint,
    /// Kinds present, in archive order
    pub kinds: Vec<ArtifactKind>,
    /// Total size of the present artifacts
    pub size_bytes: u64,
    /// Most recent modification among the present artifacts
    pub modified: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Create an empty entry
    pub fn new(dataset: &str, result_name: &str, min_suffix: u32, fingerprint: Fingerprint) -> Self {
        Self {
            dataset: dataset.to_string(),
            result_name: result_name.to_string(),
            min_suffix,
            fingerprint,
            kinds: vec![],
            size_bytes: 0,
            modified: None,
        }
    }

    /// Record one artifact file belonging to this entry
    pub fn record(&mut self, kind: ArtifactKind, size: u64, modified: Option<SystemTime>) {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
            self.kinds.sort();
        }
        self.size_bytes += size;
        if let Some(modified) = modified.map(DateTime::<Utc>::from) {
            self.modified = Some(self.modified.map_or(modified, |m| m.max(modified)));
        }
    }

    /// Whether all three artifacts are present
    pub fn is_complete(&self) -> bool {
        ArtifactKind::ALL.iter().all(|k| self.kinds.contains(k))
    }

    /// Current state
    pub fn state(&self) -> CacheState {
        if self.is_complete() {
            CacheState::Complete
        } else {
            CacheState::Partial
        }
    }
}
