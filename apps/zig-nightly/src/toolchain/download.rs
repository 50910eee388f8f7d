//! Archive download for zig-nightly.
//!
//! The tarball is streamed straight into the download cache. A file already
//! present at the target path is reused as-is; integrity is checked afterwards
//! by [`super::verify`].
//!
//! ## Behavior
//!
//! - Target is a file: skipped, reported as [`DownloadOutcome::Cached`]
//! - Target is a directory: [`NightlyError::DownloadPathIsDirectory`]
//! - Otherwise: created with exclusive-create and filled from the response body
//!
//! A body that fails mid-stream leaves no file behind.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::index::http_client;
use crate::errors::{IoResultExt, NightlyError, Result};

/// Minimum interval between progress updates in milliseconds.
const PROGRESS_INTERVAL_MS: u128 = 250;

/// What [`fetch_archive`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the outcome tells whether the archive was reused"]
pub enum DownloadOutcome {
    /// A file already existed at the target path and was kept.
    Cached,
    /// The archive was downloaded.
    Downloaded {
        /// Number of bytes written.
        bytes: u64,
    },
}

/// Downloads `url` to `dest` unless a file already exists there.
///
/// # Errors
///
/// Returns an error if:
/// - `dest` exists and is a directory
/// - The request fails or the server returns a non-success status
/// - `dest` cannot be created exclusively (it appeared concurrently)
/// - Writing the body fails, in which case the partial file is removed
pub async fn fetch_archive(
    url: &str,
    dest: &Path,
    timeout: Option<Duration>,
) -> Result<DownloadOutcome> {
    match tokio::fs::metadata(dest).await {
        Ok(meta) if meta.is_dir() => {
            return Err(NightlyError::DownloadPathIsDirectory {
                path: dest.to_path_buf(),
            });
        }
        Ok(_) => {
            debug!(path = %dest.display(), "archive already present");
            return Ok(DownloadOutcome::Cached);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(NightlyError::io(
                format!("Failed to inspect {}", dest.display()),
                e,
            ));
        }
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .io_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let client = http_client(url, timeout)?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| NightlyError::transport(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(NightlyError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let mut file = create_exclusive(dest).await?;

    let written = stream_body(response, url, dest, &mut file).await;
    drop(file);

    match written {
        Ok(bytes) => Ok(DownloadOutcome::Downloaded { bytes }),
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(dest).await {
                warn!(
                    path = %dest.display(),
                    error = %remove_err,
                    "failed to remove partial download"
                );
            }
            Err(e)
        }
    }
}

/// Creates `dest`, failing if anything already exists at that path.
///
/// The existence check in [`fetch_archive`] happens before the request, so a
/// file can appear in between; it is never truncated or removed.
async fn create_exclusive(dest: &Path) -> Result<tokio::fs::File> {
    tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .await
        .io_context(|| format!("Failed to create file: {}", dest.display()))
}

/// Copies the response body into `file`, printing progress.
async fn stream_body(
    response: reqwest::Response,
    url: &str,
    dest: &Path,
    file: &mut tokio::fs::File,
) -> Result<u64> {
    let total_size = response.content_length();
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let start_time = Instant::now();
    let mut last_update = Instant::now();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| NightlyError::transport(url, e))?;
        file.write_all(&chunk)
            .await
            .io_context(|| format!("Failed to write to {}", dest.display()))?;
        downloaded += chunk.len() as u64;

        let now = Instant::now();
        if now.duration_since(last_update).as_millis() >= PROGRESS_INTERVAL_MS {
            print_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
            last_update = now;
        }
    }

    file.flush()
        .await
        .io_context(|| format!("Failed to flush {}", dest.display()))?;

    print_progress(downloaded, total_size, start_time.elapsed().as_secs_f64());
    println!();

    Ok(downloaded)
}

/// Prints a single-line progress update, overwriting the previous one.
fn print_progress(downloaded: u64, total: Option<u64>, elapsed_secs: f64) {
    print!("\r{}     ", progress_line(downloaded, total, elapsed_secs));
    let _ = std::io::stdout().flush();
}

#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn progress_line(downloaded: u64, total: Option<u64>, elapsed_secs: f64) -> String {
    let speed = if elapsed_secs > 0.0 {
        downloaded as f64 / elapsed_secs
    } else {
        0.0
    };
    let speed_str = format_speed(speed);
    let downloaded_str = format_bytes(downloaded);

    match total {
        Some(total) if total > 0 => {
            let percent = (downloaded as f64 / total as f64 * 100.0).min(100.0) as u8;
            format!(
                "{downloaded_str}/{} ({percent}%) {speed_str}",
                format_bytes(total)
            )
        }
        _ => format!("{downloaded_str} {speed_str}"),
    }
}

/// Formats bytes into a human-readable string (KB, MB, GB).
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Formats speed (bytes/sec) into a human-readable string.
fn format_speed(speed: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    if speed >= MB {
        format!("{:.2} MB/s", speed / MB)
    } else if speed >= KB {
        format!("{:.2} KB/s", speed / KB)
    } else {
        format!("{speed:.0} B/s")
    }
}
