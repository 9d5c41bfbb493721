//! Dataset builder abstraction
//!
//! The encoder that turns a raw event log into train/validation/test splits
//! lives outside this crate. The cache only needs a capability that, given a
//! dataset and its merged properties, yields the three artifact payloads.

pub mod command;
#[cfg(test)]
pub(crate) mod fake;

pub use command::CommandBuilder;

use crate::cache::ArtifactKind;
use crate::encoding::EncodingProperties;
use crate::error::LogprepResult;
use async_trait::async_trait;
use std::path::PathBuf;
use tempfile::TempDir;

/// Location of a dataset's raw input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSource {
    /// Dataset name (directory name under the data root)
    pub name: String,
    /// Dataset directory
    pub dir: PathBuf,
    /// Raw event log (`{dir}/{name}.csv`)
    pub raw_path: PathBuf,
}

impl DatasetSource {
    /// Describe the dataset stored in `dir`
    pub fn new(name: impl Into<String>, dir: PathBuf) -> Self {
        let name = name.into();
        let raw_path = dir.join(format!("{}.csv", name));
        Self {
            name,
            dir,
            raw_path,
        }
    }
}

/// Where the bytes of one built artifact can be read from
#[derive(Debug, Clone)]
pub enum ArtifactSource {
    /// Payload held in memory
    Bytes(Vec<u8>),
    /// Payload written to a file by the encoder
    File(PathBuf),
}

/// Output of one encoder run
#[derive(Debug)]
pub struct BuiltArtifacts {
    pub train: ArtifactSource,
    pub validation: ArtifactSource,
    pub test: ArtifactSource,
    /// Scratch directory backing `File` sources; removed on drop
    scratch: Option<TempDir>,
}

impl BuiltArtifacts {
    /// Artifacts held in memory
    pub fn from_bytes(train: Vec<u8>, validation: Vec<u8>, test: Vec<u8>) -> Self {
        Self {
            train: ArtifactSource::Bytes(train),
            validation: ArtifactSource::Bytes(validation),
            test: ArtifactSource::Bytes(test),
            scratch: None,
        }
    }

    /// Artifacts written into a scratch directory that must outlive them
    pub fn in_scratch(scratch: TempDir, train: PathBuf, validation: PathBuf, test: PathBuf) -> Self {
        Self {
            train: ArtifactSource::File(train),
            validation: ArtifactSource::File(validation),
            test: ArtifactSource::File(test),
            scratch: Some(scratch),
        }
    }

    /// Source for one artifact kind
    pub fn get(&self, kind: ArtifactKind) -> &ArtifactSource {
        match kind {
            ArtifactKind::Train => &self.train,
            ArtifactKind::Validation => &self.validation,
            ArtifactKind::Test => &self.test,
        }
    }

    /// Scratch directory, if the artifacts live on disk
    pub fn scratch_dir(&self) -> Option<&std::path::Path> {
        self.scratch.as_ref().map(TempDir::path)
    }
}

/// Produces the three encoded splits for a dataset
///
/// Implementations must be deterministic for a given input and must not
/// have side effects outside their own scratch space; the cache takes care
/// of persisting the result.
#[async_trait]
pub trait DatasetBuilder: Send + Sync {
    /// Encode `source` with `properties`
    async fn build(
        &self,
        source: &DatasetSource,
        properties: &EncodingProperties,
    ) -> LogprepResult<BuiltArtifacts>;

    /// Human-readable builder name for logs
    fn name(&self) -> &'static str;
}
