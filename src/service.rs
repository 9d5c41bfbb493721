//! Encode request handling
//!
//! Ties the pieces together: validate the request, merge it onto the
//! dataset defaults, make sure the artifacts exist, and stream them back as
//! a ZIP archive.

use crate::archive::{stream_archive, ArchiveEntry};
use crate::audit::AuditLog;
use crate::builder::{CommandBuilder, DatasetBuilder};
use crate::cache::{ArtifactKey, ArtifactKind, ArtifactStore, BuildCoordinator, Fingerprint};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::encoding::{EncodingProperties, EncodingRequest};
use crate::error::LogprepResult;
use futures_util::stream::Stream;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Chunked archive bytes
pub type ArchiveBody = Pin<Box<dyn Stream<Item = io::Result<Vec<u8>>> + Send>>;

/// A ready-to-send archive
pub struct EncodedArchive {
    /// Download file name (`{dataset}.zip`)
    pub file_name: String,
    /// Fingerprint of the merged request
    pub fingerprint: Fingerprint,
    /// Archive bytes
    pub body: ArchiveBody,
}

impl std::fmt::Debug for EncodedArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedArchive")
            .field("file_name", &self.file_name)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

/// Entry point for encode, dataset listing and property lookups
pub struct EncodeService {
    catalog: Catalog,
    coordinator: Arc<BuildCoordinator>,
    chunk_size: usize,
}

impl EncodeService {
    pub fn new(catalog: Catalog, coordinator: Arc<BuildCoordinator>, chunk_size: usize) -> Self {
        Self {
            catalog,
            coordinator,
            chunk_size,
        }
    }

    /// Wire up the store, encoder command and audit log described by `config`
    pub fn from_config(config: &Config) -> Self {
        let storage = &config.storage;
        let builder = CommandBuilder::new(
            config.encoder.command.clone(),
            storage.artifact_extension.clone(),
        );
        if !builder.is_configured() {
            warn!("No encoder command configured; only cached artifacts can be served");
        }
        Self::with_builder(config, Arc::new(builder))
    }

    /// Like [`EncodeService::from_config`] with a custom builder
    pub fn with_builder(config: &Config, builder: Arc<dyn DatasetBuilder>) -> Self {
        let storage = &config.storage;
        let store = Arc::new(ArtifactStore::new(
            &storage.data_dir,
            storage.artifact_extension.clone(),
        ));
        let audit = Arc::new(AuditLog::new(&storage.data_dir, config.general.audit_log));
        let coordinator = Arc::new(BuildCoordinator::new(store, builder, audit));
        let catalog = Catalog::new(&storage.data_dir, config.defaults.clone());

        Self::new(catalog, coordinator, storage.chunk_size)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn coordinator(&self) -> &BuildCoordinator {
        &self.coordinator
    }

    /// Dataset names under the data root
    pub async fn list_datasets(&self) -> LogprepResult<Vec<String>> {
        self.catalog.datasets().await
    }

    /// Default properties for a dataset
    pub async fn dataset_properties(&self, name: &str) -> LogprepResult<EncodingProperties> {
        let source = self.catalog.locate(name).await?;
        self.catalog.default_properties(&source).await
    }

    /// Produce the archive for `request`, building artifacts on a cache miss
    ///
    /// Nothing is fingerprinted or written until the request has been
    /// validated.
    pub async fn encode(&self, request: EncodingRequest) -> LogprepResult<EncodedArchive> {
        let source = self.catalog.locate(&request.dataset_name).await?;
        let defaults = self.catalog.default_properties(&source).await?;
        let properties = request.properties.apply_to(defaults);
        properties.validate()?;

        // The encoder names its results after the dataset.
        let result_name = source.name.clone();
        let fingerprint = Fingerprint::compute(&source.name, &result_name, &properties)?;
        let key = ArtifactKey {
            dataset: source.name.clone(),
            result_name,
            fingerprint,
            min_suffix: properties.min_suffix_length,
        };
        debug!("Encode request for {} resolved to {}", source.name, key);

        let artifacts = self
            .coordinator
            .ensure_artifacts(&source, &key, &properties)
            .await?;

        let extension = self.coordinator.store().extension();
        let entries = ArtifactKind::ALL
            .iter()
            .map(|&kind| ArchiveEntry {
                name: key.download_name(kind, extension),
                handle: artifacts.get(kind).clone(),
            })
            .collect();

        info!("Streaming {} artifacts for {}", source.name, fingerprint);
        Ok(EncodedArchive {
            file_name: format!("{}.zip", source.name),
            fingerprint,
            body: Box::pin(stream_archive(entries, self.chunk_size)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::read_zip;
    use crate::builder::fake::FakeBuilder;
    use crate::cache::entry::ENCODED_DIR;
    use crate::encoding::PropertyOverrides;
    use crate::error::LogprepError;
    use futures_util::TryStreamExt;
    use tempfile::TempDir;

    struct Harness {
        _root: TempDir,
        service: EncodeService,
        builder: Arc<FakeBuilder>,
    }

    fn harness() -> Harness {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("Sepsis");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("Sepsis.csv"), "CaseID,Activity,Timestamp\n").unwrap();
        std::fs::write(
            dir.join("default_props.json"),
            r#"{"case_name": "CaseID", "concept_name": "Activity", "timestamp_name": "Timestamp"}"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.storage.data_dir = root.path().to_path_buf();
        config.general.audit_log = false;

        let builder = Arc::new(FakeBuilder::new());
        let service = EncodeService::with_builder(&config, builder.clone());
        Harness {
            _root: root,
            service,
            builder,
        }
    }

    fn min_suffix(n: u32) -> PropertyOverrides {
        PropertyOverrides {
            min_suffix_length: Some(n),
            ..PropertyOverrides::default()
        }
    }

    async fn download(service: &EncodeService, request: EncodingRequest) -> (String, Vec<(String, Vec<u8>)>) {
        let archive = service.encode(request).await.unwrap();
        let chunks: Vec<Vec<u8>> = archive.body.try_collect().await.unwrap();
        (archive.file_name, read_zip(&chunks.concat()))
    }

    #[tokio::test]
    async fn encode_returns_three_named_splits() {
        let h = harness();
        let request = EncodingRequest::new("Sepsis").with_properties(min_suffix(5));

        let (file_name, entries) = download(&h.service, request).await;

        assert_eq!(file_name, "Sepsis.zip");
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["Sepsis_5_train.pkl", "Sepsis_5_val.pkl", "Sepsis_5_test.pkl"]);
        assert_eq!(entries[1].1, FakeBuilder::payload("Sepsis", 5, "val"));
        assert_eq!(h.builder.builds(), 1);
    }

    #[tokio::test]
    async fn repeated_request_reuses_artifacts() {
        let h = harness();
        let request = EncodingRequest::new("Sepsis").with_properties(min_suffix(5));

        let (_, first) = download(&h.service, request.clone()).await;
        let (_, second) = download(&h.service, request).await;

        assert_eq!(first, second);
        assert_eq!(h.builder.builds(), 1);
    }

    #[tokio::test]
    async fn changed_parameter_builds_distinct_artifacts() {
        let h = harness();

        download(&h.service, EncodingRequest::new("Sepsis").with_properties(min_suffix(5))).await;
        let (_, entries) =
            download(&h.service, EncodingRequest::new("Sepsis").with_properties(min_suffix(6))).await;

        assert_eq!(entries[0].0, "Sepsis_6_train.pkl");
        assert_eq!(h.builder.builds(), 2);

        let cached = h.service.coordinator().store().list_entries("Sepsis").await.unwrap();
        assert_eq!(cached.len(), 2);
        assert!(cached.iter().all(|e| e.is_complete()));
    }

    #[tokio::test]
    async fn invalid_fractions_rejected_before_caching() {
        let h = harness();
        let overrides = PropertyOverrides {
            validation_fraction: Some(0.6),
            test_fraction: Some(0.6),
            ..PropertyOverrides::default()
        };

        let err = h
            .service
            .encode(EncodingRequest::new("Sepsis").with_properties(overrides))
            .await
            .unwrap_err();

        assert!(matches!(err, LogprepError::InvalidRequest(_)));
        assert_eq!(h.builder.builds(), 0);
        let encoded = h.service.catalog().data_dir().join("Sepsis").join(ENCODED_DIR);
        assert!(!encoded.exists());
    }

    #[tokio::test]
    async fn unknown_dataset() {
        let h = harness();
        let err = h.service.encode(EncodingRequest::new("Helpdesk")).await.unwrap_err();
        assert!(matches!(err, LogprepError::DatasetNotFound(_)));
    }

    #[tokio::test]
    async fn dataset_properties_merge_defaults() {
        let h = harness();
        let props = h.service.dataset_properties("Sepsis").await.unwrap();
        assert_eq!(props.case_id_column, "CaseID");
        assert_eq!(props.min_suffix_length, 5);
        assert_eq!(h.service.list_datasets().await.unwrap(), ["Sepsis"]);
    }
}
