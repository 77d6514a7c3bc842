//! Streaming SHA-256 of files on disk.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::CheckpointError;

/// Read size for hashing and downloading; bounds memory use regardless of file size.
pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Lowercase hex SHA-256 of the file at `path`, read in [`CHUNK_SIZE`] chunks.
///
/// # Errors
///
/// Returns [`CheckpointError::Io`] if the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String, CheckpointError> {
    let mut file = File::open(path).map_err(|e| CheckpointError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => hasher.update(&buffer[..read]),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(CheckpointError::io(path, e)),
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compare two hex digests, ignoring ASCII case and surrounding whitespace.
#[must_use]
pub fn digests_match(actual: &str, expected: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(expected.trim())
}
