//! Streaming ZIP export
//!
//! Builds the download archive on the fly: each artifact is read from the
//! store in bounded chunks and forwarded as it is read, so memory use does
//! not depend on artifact size.
//!
//! # Invariants
//! - Entries appear in the order given (train, val, test for downloads).
//! - The stream is single-pass; call [`stream_archive`] again to re-read.
//! - Any I/O error ends the stream; the cached artifacts are untouched.

pub mod zip;

use crate::cache::ArtifactHandle;
use flate2::Crc;
use futures_util::stream::{self, Stream};
use std::collections::VecDeque;
use std::io;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;
use zip::{CentralRecord, DosDateTime, ZIP32_LIMIT};

/// Default read size when forwarding artifact bytes
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// One file to place in the archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Name shown inside the archive
    pub name: String,
    /// Committed artifact holding the bytes
    pub handle: ArtifactHandle,
}

struct OpenEntry {
    file: File,
    name: String,
    modified: DosDateTime,
    expected: u64,
    read: u64,
    crc: Crc,
    header_offset: u32,
}

enum Phase {
    NextEntry,
    Body(Box<OpenEntry>),
    CentralDirectory,
    Finished,
}

struct ArchiveWriter {
    pending: VecDeque<ArchiveEntry>,
    phase: Phase,
    offset: u64,
    records: Vec<CentralRecord>,
    chunk_size: usize,
}

fn too_large(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{} exceeds the 4 GiB Zip32 limit", what),
    )
}

fn zip32(value: u64, what: &str) -> io::Result<u32> {
    if value > ZIP32_LIMIT {
        return Err(too_large(what));
    }
    Ok(value as u32)
}

impl ArchiveWriter {
    /// Produce the next chunk, or `None` once the end record is out
    async fn next_chunk(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::NextEntry => {
                    let Some(entry) = self.pending.pop_front() else {
                        self.phase = Phase::CentralDirectory;
                        continue;
                    };
                    return self.start_entry(entry).await.map(Some);
                }
                Phase::Body(open) => return self.continue_entry(open).await.map(Some),
                Phase::CentralDirectory => return self.central_directory().map(Some),
                Phase::Finished => return Ok(None),
            }
        }
    }

    async fn start_entry(&mut self, entry: ArchiveEntry) -> io::Result<Vec<u8>> {
        if entry.name.len() > u16::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "archive entry name too long",
            ));
        }
        zip32(entry.handle.size, &entry.name)?;
        let header_offset = zip32(self.offset, "archive offset")?;

        let file = File::open(&entry.handle.path).await?;
        let modified = DosDateTime::from_system_time(entry.handle.modified);
        debug!(
            "Adding {} ({} bytes) to archive",
            entry.name, entry.handle.size
        );

        let header = zip::local_header(&entry.name, modified);
        self.offset += header.len() as u64;
        self.phase = Phase::Body(Box::new(OpenEntry {
            file,
            name: entry.name,
            modified,
            expected: entry.handle.size,
            read: 0,
            crc: Crc::new(),
            header_offset,
        }));
        Ok(header)
    }

    async fn continue_entry(&mut self, mut open: Box<OpenEntry>) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; self.chunk_size];
        let n = open.file.read(&mut buf).await?;

        if n > 0 {
            open.read += n as u64;
            if open.read > open.expected {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{} grew while being archived", open.name),
                ));
            }
            buf.truncate(n);
            open.crc.update(&buf);
            self.offset += n as u64;
            self.phase = Phase::Body(open);
            return Ok(buf);
        }

        if open.read != open.expected {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "{} ended after {} of {} bytes",
                    open.name, open.read, open.expected
                ),
            ));
        }

        let OpenEntry {
            name,
            modified,
            read,
            crc,
            header_offset,
            ..
        } = *open;
        let crc32 = crc.sum();
        let size = zip32(read, &name)?;
        let descriptor = zip::data_descriptor(crc32, size);
        self.offset += descriptor.len() as u64;
        self.records.push(CentralRecord {
            name,
            modified,
            crc32,
            size,
            local_header_offset: header_offset,
        });
        self.phase = Phase::NextEntry;
        Ok(descriptor)
    }

    fn central_directory(&mut self) -> io::Result<Vec<u8>> {
        let dir_offset = zip32(self.offset, "central directory offset")?;
        let count = u16::try_from(self.records.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "too many archive entries")
        })?;

        let mut out = Vec::new();
        for record in &self.records {
            out.extend_from_slice(&zip::central_header(record));
        }
        let dir_size = zip32(out.len() as u64, "central directory")?;
        out.extend_from_slice(&zip::end_of_central_directory(count, dir_size, dir_offset));

        self.offset += out.len() as u64;
        self.phase = Phase::Finished;
        debug!("Archive complete: {} entries, {} bytes", count, self.offset);
        Ok(out)
    }
}

/// Stream a store-only ZIP archive of `entries`
///
/// The stream yields the local header, payload chunks of at most
/// `chunk_size` bytes and the data descriptor of each entry, then the
/// central directory. It ends after the first error.
pub fn stream_archive(
    entries: Vec<ArchiveEntry>,
    chunk_size: usize,
) -> impl Stream<Item = io::Result<Vec<u8>>> + Send + 'static {
    let writer = ArchiveWriter {
        pending: entries.into(),
        phase: Phase::NextEntry,
        offset: 0,
        records: Vec::new(),
        chunk_size: chunk_size.max(1),
    };

    stream::try_unfold(writer, |mut writer| async move {
        let chunk = writer.next_chunk().await?;
        Ok::<_, io::Error>(chunk.map(|chunk| (chunk, writer)))
    })
}
