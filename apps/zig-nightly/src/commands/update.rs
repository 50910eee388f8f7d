//! Update command for the zig-nightly CLI.
//!
//! Installs the latest build of the configured channel and points the `zig`
//! symlink at it. This is what runs when no subcommand is given.
//!
//! ## Usage
//!
//! ```bash
//! zig-nightly
//! zig-nightly update --install-dir ~/zigs --bin-dir ~/bin
//! ```

use anyhow::{Context, Result};
use tracing::warn;

use crate::config::Settings;
use crate::toolchain::{
    DownloadOutcome, ToolchainPaths, extract_archive, fetch_archive, fetch_nightly, verify_archive,
};

/// Executes the update command.
///
/// # Process
///
/// 1. Fetch the version index and select the channel/platform build
/// 2. Print the build summary
/// 3. Download the tarball unless it is already cached
/// 4. Check its size, then its SHA256 digest
/// 5. Extract it into the install root
/// 6. Repoint the `zig` symlink at the new build
///
/// # Errors
///
/// Returns an error if any step fails. Nothing is rolled back: a failed
/// extraction leaves the partial tree and the previous symlink in place.
pub async fn execute(settings: &Settings) -> Result<()> {
    let paths = ToolchainPaths::from_settings(settings);
    paths.ensure_directories()?;

    println!("Checking {} for the latest build...", settings.index_url);
    let build = fetch_nightly(settings).await?;
    println!("{}", build.summary_json());

    let filename = build.artifact.filename();
    let archive_path = paths.download_path(filename);

    if !archive_path.exists() {
        println!("Downloading {}...", build.artifact.tarball);
    }
    match fetch_archive(&build.artifact.tarball, &archive_path, settings.timeout).await? {
        DownloadOutcome::Cached => {
            println!("{} already exists, skipping download.", archive_path.display());
        }
        DownloadOutcome::Downloaded { bytes } => {
            println!("Saved {bytes} bytes to {}.", archive_path.display());
        }
    }

    println!("Verifying {}...", archive_path.display());
    verify_archive(&archive_path, &build.artifact)?;

    let install_path = paths.install_path(filename);
    println!("Extracting to {}...", paths.toolchains.display());
    extract_archive(&archive_path, &paths.toolchains)
        .with_context(|| format!("Failed to install {}", install_path.display()))?;

    let binary = paths.binary_path(filename);
    if !binary.exists() {
        warn!(path = %binary.display(), "archive did not contain the expected executable");
    }
    paths.swap_symlink(&binary)?;

    println!(
        "Successfully installed zig {} at {}",
        build.label(),
        install_path.display()
    );
    println!("{} -> {}", paths.symlink_path().display(), binary.display());

    Ok(())
}
