#![warn(clippy::pedantic)]

//! # zig-nightly
//!
//! Keeps a nightly Zig toolchain current. A run fetches the version index
//! published at <https://ziglang.org/download/index.json>, downloads the
//! `master` tarball for `x86_64-linux`, verifies its size and SHA256 digest,
//! extracts it next to earlier builds and repoints `~/.local/bin/zig` at it.
//!
//! ## Subcommands
//!
//! - `update` - Install the latest nightly (default when no subcommand is given)
//! - `check` - Report whether a newer nightly is available
//! - `list` - List installed builds
//! - `version` - Display version information
//!
//! ## Examples
//!
//! ```bash
//! zig-nightly
//! zig-nightly check
//! zig-nightly --install-dir /opt/zigs --bin-dir /usr/local/bin
//! ```

mod commands;
mod config;
mod errors;
mod logging;
mod toolchain;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{GlobalArgs, check, list, update, version};
use errors::NightlyError;

/// Installs the latest nightly Zig toolchain.
#[derive(Parser)]
#[command(
    name = "zig-nightly",
    author,
    version,
    about = "Installs the latest nightly Zig toolchain",
    long_about = "Downloads the latest nightly Zig build, verifies it against the \
    published size and SHA256 digest, extracts it and points the zig symlink at it.",
    after_help = "\
ENVIRONMENT VARIABLES:
    ZIG_NIGHTLY_INDEX_URL       Version index URL (default: https://ziglang.org/download/index.json)
    ZIG_NIGHTLY_CHANNEL         Channel key (default: master)
    ZIG_NIGHTLY_PLATFORM        Platform key (default: x86_64-linux)
    ZIG_NIGHTLY_DOWNLOAD_DIR    Download cache (default: ~/Downloads)
    ZIG_NIGHTLY_INSTALL_DIR     Install root (default: ~/.zig/zigs)
    ZIG_NIGHTLY_BIN_DIR         Symlink directory (default: ~/.local/bin)
    RUST_LOG                    Diagnostic log filter"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands for the zig-nightly CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Install the latest nightly and point the zig symlink at it.
    ///
    /// An archive already present in the download directory is reused
    /// without downloading, but is still verified.
    Update,

    /// Check whether a newer nightly is available.
    ///
    /// Compares the latest build with the target of the zig symlink.
    /// Nothing is downloaded or written.
    Check,

    /// List installed builds.
    ///
    /// Displays the builds under the install directory, newest first,
    /// and marks the one the zig symlink points into.
    List,

    /// Display version information.
    ///
    /// Use -v or --verbose for the git commit and host platform.
    Version,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Prints an error and returns the process exit code.
///
/// An occupied download path and integrity failures are announced with
/// `Install aborted` first.
fn handle_error(e: &anyhow::Error) -> i32 {
    if e
        .downcast_ref::<NightlyError>()
        .is_some_and(NightlyError::aborts_install)
    {
        eprintln!("Install aborted");
    }
    eprintln!("Error: {e:?}");
    1
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.global.verbose)?;

    match cli.command {
        Some(Commands::Version) => version::execute(cli.global.verbose),
        Some(Commands::Check) => check::execute(&cli.global.settings()?).await,
        Some(Commands::List) => list::execute(&cli.global.settings()?),
        Some(Commands::Update) | None => update::execute(&cli.global.settings()?).await,
    }
}
