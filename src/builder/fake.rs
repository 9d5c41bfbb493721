//! Deterministic in-process builder for tests

use crate::builder::{BuiltArtifacts, DatasetBuilder, DatasetSource};
use crate::encoding::EncodingProperties;
use crate::error::{LogprepError, LogprepResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Builder whose output is derived from the dataset name and min suffix
pub(crate) struct FakeBuilder {
    builds: AtomicUsize,
    delay: Duration,
    failures_left: AtomicUsize,
}

impl FakeBuilder {
    pub(crate) fn new() -> Self {
        Self {
            builds: AtomicUsize::new(0),
            delay: Duration::ZERO,
            failures_left: AtomicUsize::new(0),
        }
    }

    /// Sleep this long inside every build
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the first `n` builds
    pub(crate) fn failing(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Number of builds started so far
    pub(crate) fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Payload the builder produces for one split
    pub(crate) fn payload(dataset: &str, min_suffix: u32, split: &str) -> Vec<u8> {
        format!("{}:{}:{}", dataset, min_suffix, split).into_bytes()
    }
}

#[async_trait]
impl DatasetBuilder for FakeBuilder {
    async fn build(
        &self,
        source: &DatasetSource,
        properties: &EncodingProperties,
    ) -> LogprepResult<BuiltArtifacts> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(LogprepError::EncoderFailed {
                status: "exit status: 1".to_string(),
                stderr: "simulated encoder failure".to_string(),
            });
        }

        let n = properties.min_suffix_length;
        Ok(BuiltArtifacts::from_bytes(
            Self::payload(&source.name, n, "train"),
            Self::payload(&source.name, n, "val"),
            Self::payload(&source.name, n, "test"),
        ))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
