//! Streamed HTTP download into a temporary sibling file with atomic rename.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::digest::CHUNK_SIZE;
use crate::error::CheckpointError;

const USER_AGENT: &str = "kururi-cli";

/// Receives download progress. All methods default to no-ops.
pub trait DownloadObserver {
    /// A request to `url` is about to be sent.
    fn connecting(&mut self, _url: &str) {}

    /// The server answered; `total` is the advertised `Content-Length`, if any.
    fn started(&mut self, _url: &str, _total: Option<u64>) {}

    /// `downloaded` bytes have been written so far.
    fn advanced(&mut self, _downloaded: u64, _total: Option<u64>) {}

    /// The body was fully written and moved into place.
    fn finished(&mut self, _downloaded: u64) {}

    /// The download was abandoned.
    fn failed(&mut self) {}
}

/// Observer that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl DownloadObserver for SilentObserver {}

/// Sibling path the body is streamed into before the rename
/// (`model.pth` -> `model.pth.download`).
#[must_use]
pub fn temp_path_for(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map_or_else(|| OsString::from("checkpoint"), ToOwned::to_owned);
    name.push(".download");
    dest.with_file_name(name)
}

/// Download `url` to `dest`, returning the number of bytes written.
///
/// Parent directories are created as needed. The body goes to
/// [`temp_path_for`]`(dest)` and is renamed onto `dest` only once complete, so
/// a partial file is never visible at `dest`.
///
/// # Errors
///
/// Returns [`CheckpointError::Download`] for HTTP error statuses, connection
/// failures and timeouts, and [`CheckpointError::Io`] for local write failures.
pub fn download_file(
    url: &str,
    dest: &Path,
    timeout: Duration,
    observer: &mut dyn DownloadObserver,
) -> Result<u64, CheckpointError> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CheckpointError::io(parent, e))?;
    }

    observer.connecting(url);
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(|e| CheckpointError::download(url, e))?;

    let mut response = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|e| {
            observer.failed();
            CheckpointError::download(url, e)
        })?;

    let total = response.content_length();
    tracing::debug!(url, ?total, "checkpoint download started");
    observer.started(url, total);

    let temp_path = temp_path_for(dest);
    let streamed = stream_to_file(&mut response, &temp_path, url, total, observer)
        .and_then(|downloaded| {
            fs::rename(&temp_path, dest)
                .map(|()| downloaded)
                .map_err(|e| CheckpointError::io(dest, e))
        });

    match streamed {
        Ok(downloaded) => {
            tracing::info!(url, bytes = downloaded, dest = %dest.display(), "checkpoint downloaded");
            observer.finished(downloaded);
            Ok(downloaded)
        }
        Err(error) => {
            let _ = fs::remove_file(&temp_path);
            observer.failed();
            Err(error)
        }
    }
}

fn stream_to_file(
    body: &mut impl Read,
    temp_path: &Path,
    url: &str,
    total: Option<u64>,
    observer: &mut dyn DownloadObserver,
) -> Result<u64, CheckpointError> {
    let mut file = File::create(temp_path).map_err(|e| CheckpointError::io(temp_path, e))?;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut downloaded = 0u64;

    loop {
        let read = match body.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(CheckpointError::download(url, e)),
        };
        file.write_all(&buffer[..read])
            .map_err(|e| CheckpointError::io(temp_path, e))?;
        downloaded += read as u64;
        observer.advanced(downloaded, total);
    }

    file.sync_all()
        .map_err(|e| CheckpointError::io(temp_path, e))?;
    Ok(downloaded)
}
