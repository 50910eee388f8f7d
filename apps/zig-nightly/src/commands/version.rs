//! Version command for the zig-nightly CLI.
//!
//! Displays the version of zig-nightly itself. With `-v`, also shows the
//! git commit it was built from and the host platform.

use anyhow::Result;

/// Executes the version command.
#[allow(clippy::unnecessary_wraps)]
pub fn execute(verbose: bool) -> Result<()> {
    if verbose {
        print_verbose_version();
    } else {
        println!("zig-nightly {}", env!("CARGO_PKG_VERSION"));
    }
    Ok(())
}

/// Prints detailed version information.
fn print_verbose_version() {
    println!("zig-nightly {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Build Information:");
    println!("  Version:  {}", env!("CARGO_PKG_VERSION"));
    println!("  Commit:   {}", git_commit());
    println!("  Platform: {}", platform_string());
}

/// Returns the git commit hash from environment or a fallback.
fn git_commit() -> &'static str {
    option_env!("ZIG_NIGHTLY_GIT_COMMIT").unwrap_or("unknown")
}

/// Returns the host platform in the index's `<arch>-<os>` form.
fn platform_string() -> String {
    format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS)
}
