//! On-disk artifact store
//!
//! Artifacts live next to their dataset:
//! `{data_dir}/{dataset}/encoded/{result}_{min_suffix}_{fingerprint}_{kind}.{ext}`.
//! The file name is the cache key; no separate index is kept.
//!
//! Writes go to a hidden temp file in the same directory and are renamed
//! into place once fully synced, so a reader never sees a partial artifact.

use crate::builder::{ArtifactSource, BuiltArtifacts};
use crate::cache::entry::{CacheEntry, ENCODED_DIR};
use crate::cache::fingerprint::Fingerprint;
use crate::error::{LogprepError, LogprepResult};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// One of the three encoded splits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    Train,
    Validation,
    Test,
}

impl ArtifactKind {
    /// All kinds in archive order
    pub const ALL: [Self; 3] = [Self::Train, Self::Validation, Self::Test];

    /// Label used in file names
    pub fn label(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Validation => "val",
            Self::Test => "test",
        }
    }

    /// Parse a file-name label
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "train" => Some(Self::Train),
            "val" => Some(Self::Validation),
            "test" => Some(Self::Test),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Cache key shared by the three artifacts of one build
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub dataset: String,
    pub result_name: String,
    pub fingerprint: Fingerprint,
    pub min_suffix: u32,
}

impl ArtifactKey {
    /// Storage file name; embeds the fingerprint
    pub fn file_name(&self, kind: ArtifactKind, extension: &str) -> String {
        format!(
            "{}_{}_{}_{}.{}",
            self.result_name,
            self.min_suffix,
            self.fingerprint,
            kind.label(),
            extension
        )
    }

    /// File name shown to the user inside the archive
    pub fn download_name(&self, kind: ArtifactKind, extension: &str) -> String {
        format!(
            "{}_{}_{}.{}",
            self.dataset,
            self.min_suffix,
            kind.label(),
            extension
        )
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}_{}_{}",
            self.dataset, self.result_name, self.min_suffix, self.fingerprint
        )
    }
}

/// A committed artifact on disk
#[derive(Debug, Clone)]
pub struct ArtifactHandle {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl ArtifactHandle {
    /// Open the artifact for reading
    pub async fn open(&self) -> LogprepResult<File> {
        File::open(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogprepError::ArtifactNotFound(self.path.clone())
            } else {
                LogprepError::io(format!("opening artifact {}", self.path.display()), e)
            }
        })
    }
}

/// The three committed artifacts of one key
#[derive(Debug, Clone)]
pub struct ArtifactSet {
    pub key: ArtifactKey,
    handles: [ArtifactHandle; 3],
}

impl ArtifactSet {
    /// Handle for one kind
    pub fn get(&self, kind: ArtifactKind) -> &ArtifactHandle {
        match kind {
            ArtifactKind::Train => &self.handles[0],
            ArtifactKind::Validation => &self.handles[1],
            ArtifactKind::Test => &self.handles[2],
        }
    }

    /// Handles in archive order (train, val, test)
    pub fn iter(&self) -> impl Iterator<Item = &ArtifactHandle> {
        self.handles.iter()
    }
}

/// A fully written temp file waiting to be renamed into place
///
/// Dropping it without committing removes the temp file.
struct StagedArtifact {
    tmp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedArtifact {
    async fn commit(mut self) -> std::io::Result<()> {
        fs::rename(&self.tmp, &self.target).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.tmp);
        }
    }
}

/// Filesystem-backed artifact store rooted at the data directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    data_dir: PathBuf,
    extension: String,
}

impl ArtifactStore {
    /// Create a store rooted at `data_dir`, naming artifacts `*.{extension}`
    pub fn new(data_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            extension: extension.into(),
        }
    }

    /// Data root
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Artifact file extension (without the dot)
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Directory holding the encoded artifacts of a dataset
    pub fn encoded_dir(&self, dataset: &str) -> PathBuf {
        self.data_dir.join(dataset).join(ENCODED_DIR)
    }

    /// Committed path of an artifact
    pub fn artifact_path(&self, key: &ArtifactKey, kind: ArtifactKind) -> PathBuf {
        self.encoded_dir(&key.dataset)
            .join(key.file_name(kind, &self.extension))
    }

    /// Whether a committed artifact exists for `key` and `kind`
    pub async fn exists(&self, key: &ArtifactKey, kind: ArtifactKind) -> bool {
        fs::metadata(self.artifact_path(key, kind))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Whether all three artifacts exist (cache hit)
    pub async fn exists_all(&self, key: &ArtifactKey) -> bool {
        for kind in ArtifactKind::ALL {
            if !self.exists(key, kind).await {
                return false;
            }
        }
        true
    }

    /// Look up a committed artifact
    pub async fn open(&self, key: &ArtifactKey, kind: ArtifactKind) -> LogprepResult<ArtifactHandle> {
        let path = self.artifact_path(key, kind);
        let metadata = match fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(LogprepError::ArtifactNotFound(path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LogprepError::ArtifactNotFound(path))
            }
            Err(e) => {
                return Err(LogprepError::io(
                    format!("reading metadata of {}", path.display()),
                    e,
                ))
            }
        };

        Ok(ArtifactHandle {
            kind,
            path,
            size: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }

    /// Look up all three committed artifacts
    pub async fn open_all(&self, key: &ArtifactKey) -> LogprepResult<ArtifactSet> {
        let train = self.open(key, ArtifactKind::Train).await?;
        let validation = self.open(key, ArtifactKind::Validation).await?;
        let test = self.open(key, ArtifactKind::Test).await?;
        Ok(ArtifactSet {
            key: key.clone(),
            handles: [train, validation, test],
        })
    }

    /// Write one artifact atomically
    pub async fn write(
        &self,
        key: &ArtifactKey,
        kind: ArtifactKind,
        source: &ArtifactSource,
    ) -> LogprepResult<ArtifactHandle> {
        let staged = self.stage(key, kind, source).await?;
        let target = staged.target.clone();
        staged
            .commit()
            .await
            .map_err(|e| LogprepError::io(format!("committing {}", target.display()), e))?;
        self.open(key, kind).await
    }

    /// Write all three artifacts so they become visible together or not at all
    ///
    /// Every payload is staged before the first rename. A failed rename
    /// removes the artifacts already renamed for this key.
    pub async fn write_all(&self, key: &ArtifactKey, built: &BuiltArtifacts) -> LogprepResult<ArtifactSet> {
        let mut staged = Vec::with_capacity(ArtifactKind::ALL.len());
        for kind in ArtifactKind::ALL {
            staged.push(self.stage(key, kind, built.get(kind)).await?);
        }

        let mut committed: Vec<PathBuf> = Vec::with_capacity(staged.len());
        for artifact in staged {
            let target = artifact.target.clone();
            if let Err(e) = artifact.commit().await {
                for path in &committed {
                    if let Err(rm) = fs::remove_file(path).await {
                        warn!("Failed to roll back {}: {}", path.display(), rm);
                    }
                }
                return Err(LogprepError::io(
                    format!("committing {}", target.display()),
                    e,
                ));
            }
            committed.push(target);
        }

        debug!("Committed artifacts for {}", key);
        self.open_all(key).await
    }

    /// Copy a payload into a synced temp file next to its target
    async fn stage(
        &self,
        key: &ArtifactKey,
        kind: ArtifactKind,
        source: &ArtifactSource,
    ) -> LogprepResult<StagedArtifact> {
        let dir = self.encoded_dir(&key.dataset);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| LogprepError::io(format!("creating directory {}", dir.display()), e))?;

        let file_name = key.file_name(kind, &self.extension);
        let staged = StagedArtifact {
            tmp: dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple())),
            target: dir.join(file_name),
            committed: false,
        };

        let mut file = File::create(&staged.tmp)
            .await
            .map_err(|e| LogprepError::io(format!("creating {}", staged.tmp.display()), e))?;

        let copied = match source {
            ArtifactSource::Bytes(bytes) => file.write_all(bytes).await,
            ArtifactSource::File(path) => match File::open(path).await {
                Ok(mut input) => tokio::io::copy(&mut input, &mut file).await.map(|_| ()),
                Err(e) => Err(e),
            },
        };
        copied
            .map_err(|e| LogprepError::io(format!("writing {} artifact for {}", kind, key), e))?;

        file.flush()
            .await
            .map_err(|e| LogprepError::io(format!("flushing {}", staged.tmp.display()), e))?;
        file.sync_all()
            .await
            .map_err(|e| LogprepError::io(format!("syncing {}", staged.tmp.display()), e))?;

        Ok(staged)
    }

    /// Group the committed artifacts of a dataset into cache entries
    pub async fn list_entries(&self, dataset: &str) -> LogprepResult<Vec<CacheEntry>> {
        let dir = self.encoded_dir(dataset);
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(LogprepError::io(format!("listing {}", dir.display()), e));
            }
        };

        let mut entries: BTreeMap<(String, u32, Fingerprint), CacheEntry> = BTreeMap::new();
        while let Some(item) = read_dir
            .next_entry()
            .await
            .map_err(|e| LogprepError::io(format!("listing {}", dir.display()), e))?
        {
            let name = item.file_name().to_string_lossy().into_owned();
            let Some((result_name, min_suffix, fingerprint, kind)) =
                parse_file_name(&name, &self.extension)
            else {
                continue;
            };
            let metadata = match item.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };

            let entry = entries
                .entry((result_name.to_string(), min_suffix, fingerprint))
                .or_insert_with(|| {
                    CacheEntry::new(dataset, result_name, min_suffix, fingerprint)
                });
            entry.record(kind, metadata.len(), metadata.modified().ok());
        }

        Ok(entries.into_values().collect())
    }
}

/// Split `{result}_{min_suffix}_{fingerprint}_{kind}.{ext}` into its parts
///
/// Parsed from the right, so result names may contain underscores. Hidden
/// files (temp files) never match.
pub fn parse_file_name<'a>(
    name: &'a str,
    extension: &str,
) -> Option<(&'a str, u32, Fingerprint, ArtifactKind)> {
    if name.starts_with('.') {
        return None;
    }
    let stem = name.strip_suffix(extension)?.strip_suffix('.')?;
    let (rest, label) = stem.rsplit_once('_')?;
    let kind = ArtifactKind::from_label(label)?;
    let (rest, hex) = rest.rsplit_once('_')?;
    let fingerprint = Fingerprint::from_hex(hex)?;
    let (result_name, min_suffix) = rest.rsplit_once('_')?;
    let min_suffix = min_suffix.parse().ok()?;
    if result_name.is_empty() {
        return None;
    }
    Some((result_name, min_suffix, fingerprint, kind))
}
