// src/install/download.rs

//! Streaming archive download into a temp file
//!
//! The body is copied in fixed 8 KiB chunks, hashed on the way through, and
//! never held in memory as a whole. The temp file is deleted when the
//! returned [`DownloadedArchive`] is dropped, on success or failure.

use crate::error::{Error, Result};
use crate::filesystem::ensure_dir;
use crate::hash::verify_digest;
use crate::progress::ProgressTracker;
use crate::registry::Registry;
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// A fully downloaded archive waiting to be extracted
#[derive(Debug)]
pub struct DownloadedArchive {
    file: NamedTempFile,
    pub bytes: u64,
    pub sha256: String,
}

impl DownloadedArchive {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the temp file now, reporting any failure
    pub fn discard(self) -> Result<()> {
        let path: PathBuf = self.file.path().to_path_buf();
        self.file.close().map_err(|e| Error::io(&path, e))
    }
}

/// Download `url` into `download_dir`
///
/// Progress is reported as bytes over the declared length, or over the bytes
/// seen so far when the server declared none, so the percentage always ends
/// at 100. When `expected_sha256` is given a mismatch is `CorruptArchive`.
pub fn fetch_archive(
    registry: &dyn Registry,
    url: &str,
    download_dir: &Path,
    expected_sha256: Option<&str>,
    progress: &dyn ProgressTracker,
) -> Result<DownloadedArchive> {
    let result = stream_to_temp(registry, url, download_dir, progress).and_then(|archive| {
        if let Some(expected) = expected_sha256 {
            verify_digest(&archive.sha256, expected)
                .map_err(|e| Error::CorruptArchive(format!("{url}: {e}")))?;
            debug!("Checksum verified for {}", url);
        }
        Ok(archive)
    });

    match &result {
        Ok(archive) => progress.finish_with_message(&format!("{} bytes", archive.bytes)),
        Err(e) => progress.finish_with_error(&e.to_string()),
    }
    result
}

fn stream_to_temp(
    registry: &dyn Registry,
    url: &str,
    download_dir: &Path,
    progress: &dyn ProgressTracker,
) -> Result<DownloadedArchive> {
    ensure_dir(download_dir)?;
    let mut file = tempfile::Builder::new()
        .prefix("zarch-")
        .suffix(".tar.gz")
        .tempfile_in(download_dir)
        .map_err(|e| Error::io(download_dir, e))?;

    let mut stream = registry.download(url)?;
    let declared = stream.content_length.filter(|len| *len > 0);
    if let Some(len) = declared {
        progress.set_length(len);
    }

    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];

    loop {
        let bytes_read = stream
            .reader
            .read(&mut buffer)
            .map_err(|e| Error::NetworkError(format!("reading {url}: {e}")))?;
        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| Error::io(file.path(), e))?;
        hasher.update(&buffer[..bytes_read]);
        downloaded += bytes_read as u64;

        if declared.is_none() {
            progress.set_length(downloaded);
        }
        progress.set_position(downloaded);
    }

    file.flush().map_err(|e| Error::io(file.path(), e))?;

    // A short or overlong body still ends at 100%
    if progress.length() != downloaded {
        progress.set_length(downloaded);
        progress.set_position(downloaded);
    }

    debug!("Downloaded {} bytes from {} to {}", downloaded, url, file.path().display());
    Ok(DownloadedArchive {
        file,
        bytes: downloaded,
        sha256: hex::encode(hasher.finalize()),
    })
}
