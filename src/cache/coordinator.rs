//! Build coordination
//!
//! At most one build runs per artifact key. The first request that misses
//! the cache becomes the sole builder and spawns the build on its own task;
//! later requests for the same key subscribe to that job's outcome.
//!
//! # Job lifecycle
//!
//! | State | Meaning |
//! |-------|---------|
//! | Running | Build task in progress, waiters subscribed |
//! | Done | All three artifacts committed to the store |
//! | Failed | Encoder or store write failed; reported to every waiter |
//!
//! A job leaves the table in the same critical section that publishes its
//! outcome. Failures are not remembered: the next request starts over.

use crate::audit::AuditLog;
use crate::builder::{DatasetBuilder, DatasetSource};
use crate::cache::store::{ArtifactKey, ArtifactSet, ArtifactStore};
use crate::encoding::EncodingProperties;
use crate::error::{LogprepError, LogprepResult};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
enum JobState {
    Running,
    Done,
    Failed(String),
}

type JobTable = HashMap<ArtifactKey, watch::Receiver<JobState>>;

fn lock_jobs(jobs: &Mutex<JobTable>) -> MutexGuard<'_, JobTable> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Publishes a job's outcome and removes it from the table
///
/// If the build task unwinds before resolving, dropping the guard reports a
/// failure so waiters are never left hanging.
struct JobGuard {
    jobs: Arc<Mutex<JobTable>>,
    key: ArtifactKey,
    tx: Option<watch::Sender<JobState>>,
}

impl JobGuard {
    fn resolve(mut self, state: JobState) {
        self.finish(state);
    }

    fn finish(&mut self, state: JobState) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let mut jobs = lock_jobs(&self.jobs);
        jobs.remove(&self.key);
        tx.send_replace(state);
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        if self.tx.is_some() {
            warn!("Build task for {} ended without an outcome", self.key);
            self.finish(JobState::Failed("build task aborted".to_string()));
        }
    }
}

/// Everything a spawned build task needs
struct BuildTask {
    store: Arc<ArtifactStore>,
    builder: Arc<dyn DatasetBuilder>,
    audit: Arc<AuditLog>,
    source: DatasetSource,
    key: ArtifactKey,
    properties: EncodingProperties,
}

impl BuildTask {
    async fn run(self, guard: JobGuard) {
        let state = match self.build().await {
            Ok(()) => JobState::Done,
            Err(e) => {
                warn!("Build failed for {}: {}", self.key, e);
                self.audit
                    .log(
                        "build.failed",
                        &json!({
                            "dataset": self.key.dataset,
                            "fingerprint": self.key.fingerprint.to_hex(),
                            "error": e.to_string(),
                        }),
                    )
                    .await;
                JobState::Failed(e.to_string())
            }
        };
        guard.resolve(state);
    }

    async fn build(&self) -> LogprepResult<()> {
        // A job for this key may have finished between the caller's cache
        // check and the creation of this one.
        if self.store.exists_all(&self.key).await {
            debug!("Artifacts for {} appeared before build started", self.key);
            return Ok(());
        }

        info!(
            "Building {} with {} encoder (min suffix {})",
            self.key.dataset,
            self.builder.name(),
            self.key.min_suffix
        );
        self.audit
            .log(
                "build.started",
                &json!({
                    "dataset": self.key.dataset,
                    "fingerprint": self.key.fingerprint.to_hex(),
                    "min_suffix": self.key.min_suffix,
                    "builder": self.builder.name(),
                }),
            )
            .await;

        let started = Instant::now();
        let built = self.builder.build(&self.source, &self.properties).await?;
        self.store.write_all(&self.key, &built).await?;
        if let Some(scratch) = built.scratch_dir() {
            debug!("Releasing scratch directory {}", scratch.display());
        }
        let elapsed_ms = started.elapsed().as_millis() as u64;

        info!("Built {} in {} ms", self.key, elapsed_ms);
        self.audit
            .log(
                "build.completed",
                &json!({
                    "dataset": self.key.dataset,
                    "fingerprint": self.key.fingerprint.to_hex(),
                    "elapsed_ms": elapsed_ms,
                }),
            )
            .await;
        Ok(())
    }
}

/// Collapses concurrent identical builds into one
pub struct BuildCoordinator {
    store: Arc<ArtifactStore>,
    builder: Arc<dyn DatasetBuilder>,
    audit: Arc<AuditLog>,
    jobs: Arc<Mutex<JobTable>>,
}

impl BuildCoordinator {
    /// Create a coordinator over `store` using `builder` on cache misses
    pub fn new(store: Arc<ArtifactStore>, builder: Arc<dyn DatasetBuilder>, audit: Arc<AuditLog>) -> Self {
        Self {
            store,
            builder,
            audit,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Underlying artifact store
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Number of builds currently running
    pub fn in_flight(&self) -> usize {
        lock_jobs(&self.jobs).len()
    }

    /// Return the artifacts for `key`, building them if the cache misses
    ///
    /// Dropping the returned future stops waiting but never cancels the
    /// build; it runs to completion on its own task.
    pub async fn ensure_artifacts(
        &self,
        source: &DatasetSource,
        key: &ArtifactKey,
        properties: &EncodingProperties,
    ) -> LogprepResult<ArtifactSet> {
        if self.store.exists_all(key).await {
            debug!("Cache hit for {}", key);
            self.audit
                .log(
                    "cache.hit",
                    &json!({
                        "dataset": key.dataset,
                        "fingerprint": key.fingerprint.to_hex(),
                    }),
                )
                .await;
            return self.store.open_all(key).await;
        }

        let mut rx = self.join_or_start(source, key, properties);
        let outcome = rx
            .wait_for(|state| *state != JobState::Running)
            .await
            .map(|state| state.clone());

        match outcome {
            Ok(JobState::Done) => self.store.open_all(key).await,
            Ok(JobState::Failed(reason)) => Err(LogprepError::build_failed(&key.dataset, reason)),
            Ok(JobState::Running) | Err(_) => Err(LogprepError::build_failed(
                &key.dataset,
                "build task ended without reporting an outcome",
            )),
        }
    }

    /// Subscribe to the running job for `key`, or start one
    fn join_or_start(
        &self,
        source: &DatasetSource,
        key: &ArtifactKey,
        properties: &EncodingProperties,
    ) -> watch::Receiver<JobState> {
        let mut jobs = lock_jobs(&self.jobs);
        if let Some(rx) = jobs.get(key) {
            debug!("Joining in-flight build for {}", key);
            return rx.clone();
        }

        let (tx, rx) = watch::channel(JobState::Running);
        jobs.insert(key.clone(), rx.clone());
        drop(jobs);

        debug!("Cache miss for {}, starting build", key);
        let guard = JobGuard {
            jobs: Arc::clone(&self.jobs),
            key: key.clone(),
            tx: Some(tx),
        };
        let task = BuildTask {
            store: Arc::clone(&self.store),
            builder: Arc::clone(&self.builder),
            audit: Arc::clone(&self.audit),
            source: source.clone(),
            key: key.clone(),
            properties: properties.clone(),
        };
        tokio::spawn(task.run(guard));

        rx
    }
}
