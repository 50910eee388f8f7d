//! Runtime settings for zig-nightly.
//!
//! Every location and endpoint the workflow touches lives in [`Settings`], so
//! tests can point the whole run at temporary directories and a local server.
//!
//! ## Resolution
//!
//! Each value is taken from, in order:
//! 1. the matching command-line flag
//! 2. the matching environment variable
//! 3. the built-in default
//!
//! Empty or whitespace-only environment values are treated as unset. A
//! leading `~` in a directory is expanded to the home directory, and relative
//! directories are made absolute against the current directory once all
//! sources are applied (see [`Settings::resolve_directories`]).
//!
//! ```text
//! ZIG_NIGHTLY_INDEX_URL      https://ziglang.org/download/index.json
//! ZIG_NIGHTLY_CHANNEL        master
//! ZIG_NIGHTLY_PLATFORM       x86_64-linux
//! ZIG_NIGHTLY_DOWNLOAD_DIR   ~/Downloads
//! ZIG_NIGHTLY_INSTALL_DIR    ~/.zig/zigs
//! ZIG_NIGHTLY_BIN_DIR        ~/.local/bin
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

/// Environment variable overriding the version index URL.
pub const INDEX_URL_ENV: &str = "ZIG_NIGHTLY_INDEX_URL";
/// Environment variable overriding the channel name.
pub const CHANNEL_ENV: &str = "ZIG_NIGHTLY_CHANNEL";
/// Environment variable overriding the platform identifier.
pub const PLATFORM_ENV: &str = "ZIG_NIGHTLY_PLATFORM";
/// Environment variable overriding the download cache directory.
pub const DOWNLOAD_DIR_ENV: &str = "ZIG_NIGHTLY_DOWNLOAD_DIR";
/// Environment variable overriding the install root.
pub const INSTALL_DIR_ENV: &str = "ZIG_NIGHTLY_INSTALL_DIR";
/// Environment variable overriding the symlink directory.
pub const BIN_DIR_ENV: &str = "ZIG_NIGHTLY_BIN_DIR";

/// Default version index published by the Zig project.
pub const DEFAULT_INDEX_URL: &str = "https://ziglang.org/download/index.json";

/// Nightly builds are published under this channel key.
pub const DEFAULT_CHANNEL: &str = "master";

/// The only platform this tool installs by default.
pub const DEFAULT_PLATFORM: &str = "x86_64-linux";

/// Name of the executable inside an installed toolchain and of the symlink.
pub const BINARY_NAME: &str = "zig";

/// Settings for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// URL of the JSON version index.
    pub index_url: String,
    /// Channel key inside the index (`master` for nightly).
    pub channel: String,
    /// Platform key inside the channel record.
    pub platform: String,
    /// Where downloaded tarballs are cached.
    pub download_dir: PathBuf,
    /// Where tarballs are unpacked, one directory per build.
    pub install_dir: PathBuf,
    /// Directory holding the `zig` symlink; expected to be on `PATH`.
    pub bin_dir: PathBuf,
    /// Name of the executable linked into `bin_dir`.
    pub binary_name: String,
    /// Optional per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Settings {
    /// Builds settings from environment variables and home-directory defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory is not overridden and the home
    /// directory cannot be determined.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        let home = dirs::home_dir();
        let dir = |key: &str, default: &[&str]| -> Result<PathBuf> {
            if let Some(value) = var(key) {
                return Ok(PathBuf::from(value.trim()));
            }
            let home = home.as_deref().with_context(|| {
                format!("Cannot determine home directory. Set {key} environment variable.")
            })?;
            Ok(default.iter().fold(home.to_path_buf(), |p, c| p.join(c)))
        };

        Ok(Self {
            index_url: var(INDEX_URL_ENV)
                .map_or_else(|| DEFAULT_INDEX_URL.to_string(), |s| s.trim().to_string()),
            channel: var(CHANNEL_ENV)
                .map_or_else(|| DEFAULT_CHANNEL.to_string(), |s| s.trim().to_string()),
            platform: var(PLATFORM_ENV)
                .map_or_else(|| DEFAULT_PLATFORM.to_string(), |s| s.trim().to_string()),
            download_dir: dir(DOWNLOAD_DIR_ENV, &["Downloads"])?,
            install_dir: dir(INSTALL_DIR_ENV, &[".zig", "zigs"])?,
            bin_dir: dir(BIN_DIR_ENV, &[".local", "bin"])?,
            binary_name: BINARY_NAME.to_string(),
            timeout: None,
        })
    }

    /// Expands `~` and makes the three directories absolute.
    ///
    /// The symlink target is written from these paths, and a relative target
    /// would be resolved against the bin directory instead of the current one.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory starts with `~` and the home directory
    /// cannot be determined, or if the current directory cannot be read.
    pub fn resolve_directories(&mut self) -> Result<()> {
        let home = dirs::home_dir();
        for dir in [
            &mut self.download_dir,
            &mut self.install_dir,
            &mut self.bin_dir,
        ] {
            let resolved = absolute_dir(dir, home.as_deref())?;
            *dir = resolved;
        }
        Ok(())
    }

    /// Creates settings rooted at a single directory.
    ///
    /// Used by tests: `downloads/`, `zigs/` and `bin/` are placed under `root`.
    #[cfg(test)]
    #[must_use = "returns new settings without side effects"]
    pub fn with_root(root: &std::path::Path, index_url: impl Into<String>) -> Self {
        Self {
            index_url: index_url.into(),
            channel: DEFAULT_CHANNEL.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            download_dir: root.join("downloads"),
            install_dir: root.join("zigs"),
            bin_dir: root.join("bin"),
            binary_name: BINARY_NAME.to_string(),
            timeout: None,
        }
    }
}

fn absolute_dir(path: &Path, home: Option<&Path>) -> Result<PathBuf> {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => home
            .with_context(|| {
                format!("Cannot determine home directory to expand {}", path.display())
            })?
            .join(rest),
        Err(_) => path.to_path_buf(),
    };
    std::path::absolute(&expanded)
        .with_context(|| format!("Failed to resolve directory: {}", expanded.display()))
}
