//! Integrity checks for downloaded archives.
//!
//! Two checks run in order: the on-disk size against the index size, then the
//! SHA256 digest against the index `shasum`. Hashing is skipped when the size
//! is already wrong.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use super::index::Artifact;
use crate::errors::{IoResultExt, NightlyError, Result};

/// Checks that `file_path` is exactly `expected` bytes long.
///
/// # Errors
///
/// Returns [`NightlyError::SizeMismatch`] on a mismatch, or an I/O error if
/// the file cannot be inspected.
pub fn verify_size(file_path: &Path, expected: u64) -> Result<()> {
    let actual = std::fs::metadata(file_path)
        .io_context(|| format!("Failed to read metadata: {}", file_path.display()))?
        .len();

    if actual != expected {
        return Err(NightlyError::SizeMismatch {
            path: file_path.to_path_buf(),
            actual,
            expected,
        });
    }
    Ok(())
}

/// Verifies that a file matches the expected SHA256 checksum.
///
/// The comparison ignores case.
///
/// # Errors
///
/// Returns [`NightlyError::DigestMismatch`] on a mismatch, or an I/O error if
/// the file cannot be read.
pub fn verify_digest(file_path: &Path, expected: &str) -> Result<()> {
    let computed = compute_sha256(file_path)?;

    if !computed.eq_ignore_ascii_case(expected.trim()) {
        return Err(NightlyError::DigestMismatch {
            path: file_path.to_path_buf(),
            expected: expected.trim().to_string(),
            actual: computed,
        });
    }
    Ok(())
}

/// Runs the size check and then the digest check for an index artifact.
///
/// # Errors
///
/// Returns the first failing check's error.
pub fn verify_archive(file_path: &Path, artifact: &Artifact) -> Result<()> {
    verify_size(file_path, artifact.size)?;
    debug!(path = %file_path.display(), size = artifact.size, "size matches");
    verify_digest(file_path, &artifact.shasum)?;
    debug!(path = %file_path.display(), "digest matches");
    Ok(())
}

/// Computes the SHA256 hash of a file.
///
/// # Returns
///
/// The SHA256 hash as a lowercase hex string.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(file_path)
        .io_context(|| format!("Failed to open file for checksum: {}", file_path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let bytes_read = file.read(&mut buffer).io_context(|| {
            format!("Failed to read file for checksum: {}", file_path.display())
        })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
