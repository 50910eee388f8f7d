//! List command for the zig-nightly CLI.
//!
//! Displays the builds found under the install root and marks the one the
//! `zig` symlink points into.
//!
//! ## Output Format
//!
//! ```text
//! Installed builds:
//!
//! * zig-linux-x86_64-0.14.0-dev.2+0884a4341    (0.14.0-dev.2+0884a4341, active)
//!   zig-linux-x86_64-0.13.0                    (0.13.0)
//! ```

use anyhow::Result;

use crate::config::Settings;
use crate::toolchain::ToolchainPaths;

/// Executes the list command.
///
/// # Errors
///
/// Returns an error if the install root cannot be read.
pub fn execute(settings: &Settings) -> Result<()> {
    let paths = ToolchainPaths::from_settings(settings);
    let installed = paths.list_installed()?;
    let active = paths.active_install();

    if installed.is_empty() {
        println!("No builds installed in {}.", paths.toolchains.display());
        println!();
        println!("Run 'zig-nightly' to install the latest nightly.");
        return Ok(());
    }

    println!("Installed builds:");
    println!();

    let width = installed.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for toolchain in &installed {
        let is_active = active.as_deref() == Some(toolchain.name.as_str());

        let mut info_parts = Vec::new();
        if let Some(version) = &toolchain.version {
            info_parts.push(version.to_string());
        }
        if is_active {
            info_parts.push("active".to_string());
        }

        let marker = if is_active { "*" } else { " " };
        if info_parts.is_empty() {
            println!("{marker} {}", toolchain.name);
        } else {
            println!(
                "{marker} {:<width$}    ({})",
                toolchain.name,
                info_parts.join(", ")
            );
        }
    }

    if active.is_none() {
        println!();
        println!(
            "{} does not point into {}.",
            paths.symlink_path().display(),
            paths.toolchains.display()
        );
    }

    Ok(())
}
