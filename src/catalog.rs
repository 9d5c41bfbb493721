//! Dataset discovery
//!
//! Every directory directly under the data root is a dataset:
//!
//! ```text
//! {data_dir}/{name}/{name}.csv            raw event log
//! {data_dir}/{name}/default_props.json    optional property defaults
//! {data_dir}/{name}/encoded/              cached artifacts
//! ```
//!
//! Hidden directories (such as `.logprep`) are not datasets.

use crate::builder::DatasetSource;
use crate::encoding::{validate_dataset_name, EncodingProperties, PropertyOverrides};
use crate::error::{LogprepError, LogprepResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Per-dataset defaults file
pub const DEFAULT_PROPS_FILE: &str = "default_props.json";

/// Datasets under a data root, with the global property defaults
#[derive(Debug, Clone)]
pub struct Catalog {
    data_dir: PathBuf,
    defaults: EncodingProperties,
}

impl Catalog {
    pub fn new(data_dir: impl Into<PathBuf>, defaults: EncodingProperties) -> Self {
        Self {
            data_dir: data_dir.into(),
            defaults,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Dataset names, sorted; empty if the data root does not exist
    pub async fn datasets(&self) -> LogprepResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Data directory {} does not exist", self.data_dir.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(LogprepError::io(
                    format!("reading {}", self.data_dir.display()),
                    e,
                ))
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LogprepError::io(format!("reading {}", self.data_dir.display()), e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    /// Resolve a dataset name to its directory
    ///
    /// The directory must hold the raw `{name}.csv`; a dataset without one
    /// cannot be encoded.
    pub async fn locate(&self, name: &str) -> LogprepResult<DatasetSource> {
        validate_dataset_name(name)?;

        let source = DatasetSource::new(name, self.data_dir.join(name));
        match fs::metadata(&source.raw_path).await {
            Ok(meta) if meta.is_file() => Ok(source),
            _ => {
                debug!("No raw event log at {}", source.raw_path.display());
                Err(LogprepError::DatasetNotFound(name.to_string()))
            }
        }
    }

    /// Global defaults with the dataset's `default_props.json` layered on top
    pub async fn default_properties(&self, source: &DatasetSource) -> LogprepResult<EncodingProperties> {
        let path = source.dir.join(DEFAULT_PROPS_FILE);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No {} for {}, using global defaults", DEFAULT_PROPS_FILE, source.name);
                return Ok(self.defaults.clone());
            }
            Err(e) => return Err(LogprepError::io(format!("reading {}", path.display()), e)),
        };

        let overrides: PropertyOverrides =
            serde_json::from_str(&content).map_err(|e| LogprepError::ConfigInvalid {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Ok(overrides.apply_to(self.defaults.clone()))
    }
}
