//! Check command for the zig-nightly CLI.
//!
//! Fetches the version index and reports whether the active `zig` symlink
//! already points at the latest build. Nothing is downloaded or written.
//!
//! ## Output Format
//!
//! ```text
//! { ...build summary... }
//! Update available: zig 0.14.0-dev.2+0884a4341
//!   current: zig-linux-x86_64-0.14.0-dev.1+aaaaaaaaa
//! Run 'zig-nightly' to install it.
//! ```

use anyhow::Result;

use crate::config::Settings;
use crate::toolchain::{ToolchainPaths, fetch_nightly};

/// Executes the check command.
///
/// # Errors
///
/// Returns an error if the index cannot be fetched or has no matching build.
pub async fn execute(settings: &Settings) -> Result<()> {
    let paths = ToolchainPaths::from_settings(settings);

    println!("Checking {} for the latest build...", settings.index_url);
    let build = fetch_nightly(settings).await?;
    println!("{}", build.summary_json());

    let filename = build.artifact.filename();
    if paths.is_active(filename) {
        println!("zig {} is up to date.", build.label());
        return Ok(());
    }

    println!("Update available: zig {}", build.label());
    match paths.active_install() {
        Some(current) => println!("  current: {current}"),
        None => match paths.active_target() {
            Some(target) => println!("  current: {}", target.display()),
            None => println!(
                "  current: none ({} not found)",
                paths.symlink_path().display()
            ),
        },
    }
    println!("Run 'zig-nightly' to install it.");

    Ok(())
}
