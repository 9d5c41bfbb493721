//! External encoder process
//!
//! Runs the configured encoder command once per build. The command reads its
//! inputs from environment variables and writes `train.{ext}`, `val.{ext}`
//! and `test.{ext}` into a fresh scratch directory:
//!
//! | Variable | Value |
//! |----------|-------|
//! | `LOGPREP_DATASET` | Dataset name |
//! | `LOGPREP_INPUT` | Raw event log (`{dataset}.csv`) |
//! | `LOGPREP_PROPERTIES` | JSON file with the merged properties |
//! | `LOGPREP_OUTPUT_DIR` | Directory the splits must be written to |
//! | `LOGPREP_EXTENSION` | Artifact file extension |

use crate::builder::{BuiltArtifacts, DatasetBuilder, DatasetSource};
use crate::cache::ArtifactKind;
use crate::encoding::EncodingProperties;
use crate::error::{LogprepError, LogprepResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

/// Builder that shells out to an external encoder
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    argv: Vec<String>,
    extension: String,
}

impl CommandBuilder {
    /// Create a builder running `argv`; an empty argv fails every build
    pub fn new(argv: Vec<String>, extension: impl Into<String>) -> Self {
        Self {
            argv,
            extension: extension.into(),
        }
    }

    /// Whether an encoder command is configured
    pub fn is_configured(&self) -> bool {
        !self.argv.is_empty()
    }
}

#[async_trait]
impl DatasetBuilder for CommandBuilder {
    async fn build(
        &self,
        source: &DatasetSource,
        properties: &EncodingProperties,
    ) -> LogprepResult<BuiltArtifacts> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(LogprepError::EncoderNotConfigured);
        };

        if !source.raw_path.is_file() {
            return Err(LogprepError::build_failed(
                &source.name,
                format!("raw event log {} not found", source.raw_path.display()),
            ));
        }

        let scratch = tempfile::Builder::new()
            .prefix("logprep-build-")
            .tempdir()
            .map_err(|e| LogprepError::io("creating build scratch directory", e))?;
        let output_dir = scratch.path().join("out");
        fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| LogprepError::io(format!("creating {}", output_dir.display()), e))?;

        let properties_path = scratch.path().join("properties.json");
        fs::write(&properties_path, serde_json::to_vec_pretty(properties)?)
            .await
            .map_err(|e| LogprepError::io(format!("writing {}", properties_path.display()), e))?;

        debug!("Executing encoder: {} {:?}", program, args);
        let output = Command::new(program)
            .args(args)
            .current_dir(&source.dir)
            .env("LOGPREP_DATASET", &source.name)
            .env("LOGPREP_INPUT", &source.raw_path)
            .env("LOGPREP_PROPERTIES", &properties_path)
            .env("LOGPREP_OUTPUT_DIR", &output_dir)
            .env("LOGPREP_EXTENSION", &self.extension)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| LogprepError::io(format!("spawning encoder {}", program), e))?;

        if !output.status.success() {
            return Err(LogprepError::EncoderFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let split_path = |kind: ArtifactKind| -> LogprepResult<PathBuf> {
            let path = output_dir.join(format!("{}.{}", kind.label(), self.extension));
            if path.is_file() {
                Ok(path)
            } else {
                Err(LogprepError::build_failed(
                    &source.name,
                    format!("encoder did not produce {}", path.display()),
                ))
            }
        };
        let train = split_path(ArtifactKind::Train)?;
        let validation = split_path(ArtifactKind::Validation)?;
        let test = split_path(ArtifactKind::Test)?;

        Ok(BuiltArtifacts::in_scratch(scratch, train, validation, test))
    }

    fn name(&self) -> &'static str {
        "command"
    }
}
