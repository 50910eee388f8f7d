//! Error types for the zig-nightly CLI.
//!
//! The toolchain modules return [`NightlyError`] so that callers and tests can
//! tell a transport failure apart from a malformed index or an integrity
//! failure. Command handlers wrap these in `anyhow::Error` with extra context;
//! `main` downcasts back to decide how to report them.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the toolchain modules.
pub type Result<T> = std::result::Result<T, NightlyError>;

/// Consolidated error type for zig-nightly operations.
#[derive(Debug, Error)]
pub enum NightlyError {
    /// The request could not be sent, or the response body could not be read.
    #[error("failed to reach {url}")]
    Transport {
        /// The URL being requested.
        url: String,
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status code.
    #[error("HTTP error {status}: {url}")]
    HttpStatus {
        /// The status code returned by the server.
        status: u16,
        /// The URL being requested.
        url: String,
    },

    /// The version index is not a JSON object.
    #[error("malformed version index from {url}")]
    MalformedIndex {
        /// The URL the index was fetched from.
        url: String,
        /// The JSON parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The requested channel is not present in the version index.
    #[error("channel '{channel}' not found in version index")]
    ChannelNotFound {
        /// The channel that was looked up.
        channel: String,
    },

    /// The channel record has no entry for the requested platform.
    #[error("platform '{platform}' not found in channel '{channel}'")]
    PlatformNotFound {
        /// The channel that was searched.
        channel: String,
        /// The platform identifier that was looked up.
        platform: String,
    },

    /// A record in the index is missing fields or has unusable values.
    #[error("malformed record for '{key}': {message}")]
    MalformedRecord {
        /// The index key of the offending record.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// The download target exists but is a directory.
    #[error("download path {} already exists and is a directory", path.display())]
    DownloadPathIsDirectory {
        /// The download target path.
        path: PathBuf,
    },

    /// The archive on disk does not have the size reported by the index.
    #[error("tarball {} is {actual} bytes, expected {expected}", path.display())]
    SizeMismatch {
        /// The archive that was checked.
        path: PathBuf,
        /// Size found on disk.
        actual: u64,
        /// Size reported by the index.
        expected: u64,
    },

    /// The archive's SHA256 digest does not match the index.
    #[error("tarball {} has digest {actual}, expected {expected}", path.display())]
    DigestMismatch {
        /// The archive that was checked.
        path: PathBuf,
        /// Digest reported by the index.
        expected: String,
        /// Digest computed from the file.
        actual: String,
    },

    /// An archive entry was rejected by the extraction filter.
    #[error("refusing to extract {entry}: {reason}")]
    UnsafeArchiveEntry {
        /// The entry path as stored in the archive.
        entry: String,
        /// Why the entry was rejected.
        reason: String,
    },

    /// The archive has a suffix this tool cannot unpack.
    #[error("unsupported archive format: {}", path.display())]
    UnsupportedArchive {
        /// The archive path.
        path: PathBuf,
    },

    /// Any other filesystem error.
    #[error("{message}")]
    Io {
        /// Description of the operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl NightlyError {
    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Creates a new `MalformedRecord` error.
    #[must_use]
    pub fn malformed_record(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new `UnsafeArchiveEntry` error.
    #[must_use]
    pub fn unsafe_entry(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsafeArchiveEntry {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `Io` error from an I/O error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Returns true for the guard failures that abort an install outright:
    /// an occupied download path or a failed integrity check.
    #[must_use]
    pub fn aborts_install(&self) -> bool {
        matches!(
            self,
            Self::DownloadPathIsDirectory { .. }
                | Self::SizeMismatch { .. }
                | Self::DigestMismatch { .. }
        )
    }
}

/// Attaches a message to an `std::io::Result`, converting it to a [`NightlyError`].
pub(crate) trait IoResultExt<T> {
    fn io_context<F, S>(self, message: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn io_context<F, S>(self, message: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|source| NightlyError::io(message(), source))
    }
}
