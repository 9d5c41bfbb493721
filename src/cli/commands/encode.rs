//! Encode command - build (or reuse) artifacts and write the archive

use crate::cli::args::EncodeArgs;
use crate::config::Config;
use crate::encoding::{EncodingRequest, PropertyOverrides};
use crate::error::{LogprepError, LogprepResult};
use crate::service::{ArchiveBody, EncodeService};
use crate::ui::{self, TaskSpinner, UiContext};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Execute the encode command
pub async fn execute(args: EncodeArgs, config: &Config) -> LogprepResult<()> {
    let to_stdout = args.output.as_deref() == Some(Path::new("-"));
    let ctx = if to_stdout {
        UiContext::with_stdout_reserved()
    } else {
        UiContext::detect()
    };

    let overrides = match &args.properties {
        Some(path) => read_overrides(path).await?,
        None => PropertyOverrides::default(),
    };
    let request = EncodingRequest::new(&args.dataset).with_properties(overrides);
    let service = EncodeService::from_config(config);

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Preparing artifacts for {}...", args.dataset));
    let archive = match service.encode(request).await {
        Ok(archive) => {
            spinner.stop(&format!("Artifacts ready ({})", archive.fingerprint));
            archive
        }
        Err(e) => {
            spinner.stop_error("Encoding failed");
            return Err(e);
        }
    };

    if to_stdout {
        let written = copy_body(archive.body, &mut tokio::io::stdout()).await?;
        debug!("Wrote {} archive bytes to stdout", written);
        return Ok(());
    }

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&archive.file_name));
    let written = write_archive(archive.body, &output).await?;
    ui::step_ok_detail(
        &ctx,
        &format!("Archive written to {}", output.display()),
        &crate::cache::format_bytes(written),
    );
    Ok(())
}

async fn read_overrides(path: &Path) -> LogprepResult<PropertyOverrides> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| LogprepError::io(format!("reading {}", path.display()), e))?;
    serde_json::from_str(&content)
        .map_err(|e| LogprepError::invalid(format!("{}: {}", path.display(), e)))
}

async fn copy_body<W>(mut body: ArchiveBody, out: &mut W) -> LogprepResult<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| LogprepError::io("streaming archive", e))?;
        out.write_all(&chunk)
            .await
            .map_err(|e| LogprepError::io("writing archive", e))?;
        written += chunk.len() as u64;
    }
    out.flush()
        .await
        .map_err(|e| LogprepError::io("writing archive", e))?;
    Ok(written)
}

/// Write the archive, removing the partial file if streaming fails
async fn write_archive(body: ArchiveBody, path: &Path) -> LogprepResult<u64> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| LogprepError::io(format!("creating {}", path.display()), e))?;

    match copy_body(body, &mut file).await {
        Ok(written) => Ok(written),
        Err(e) => {
            drop(file);
            let _ = fs::remove_file(path).await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::io;
    use tempfile::TempDir;

    #[tokio::test]
    async fn failed_stream_leaves_no_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Sepsis.zip");
        let body: ArchiveBody = Box::pin(stream::iter(vec![
            Ok(b"PK".to_vec()),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated")),
        ]));

        let err = write_archive(body, &path).await.unwrap_err();
        assert!(matches!(err, LogprepError::Io { .. }));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn reads_wire_named_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("props.json");
        std::fs::write(&path, r#"{"min_suffix_size": 6, "window_size": 4}"#).unwrap();

        let overrides = read_overrides(&path).await.unwrap();
        assert_eq!(overrides.min_suffix_length, Some(6));
    }
}
