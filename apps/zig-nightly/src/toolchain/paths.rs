//! Path management for zig-nightly.
//!
//! ## Directory Structure
//!
//! ```text
//! ~/Downloads/                                  # download cache
//!   zig-linux-x86_64-0.14.0-dev.2+0884a4341.tar.xz
//! ~/.zig/zigs/                                  # install root
//!   zig-linux-x86_64-0.14.0-dev.2+0884a4341/    # one directory per build
//!     zig
//!     lib/
//! ~/.local/bin/
//!   zig -> ~/.zig/zigs/zig-linux-x86_64-0.14.0-dev.2+0884a4341/zig
//! ```
//!
//! The install directory of a build is named after its archive with the
//! two-part suffix removed; nothing inside the archive is inspected.

use std::cmp::Ordering;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use semver::Version;
use tracing::debug;

use crate::config::Settings;
use crate::errors::{IoResultExt, NightlyError, Result};

/// Filesystem locations used by one run.
#[derive(Debug, Clone)]
pub struct ToolchainPaths {
    /// Download cache directory.
    pub downloads: PathBuf,
    /// Install root holding one directory per build.
    pub toolchains: PathBuf,
    /// Directory holding the active symlink.
    pub bin: PathBuf,
    /// Name of the executable and of the symlink.
    pub binary_name: String,
}

/// An install directory found under the install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledToolchain {
    /// Directory name, e.g. `zig-linux-x86_64-0.14.0-dev.2+0884a4341`.
    pub name: String,
    /// Version embedded in the name, when one can be parsed.
    pub version: Option<Version>,
}

impl InstalledToolchain {
    fn new(name: String) -> Self {
        let version = version_from_dir_name(&name);
        Self { name, version }
    }

    /// Newest first: parsed versions descending, then unparsed names ascending.
    fn newest_first(&self, other: &Self) -> Ordering {
        match (&self.version, &other.version) {
            (Some(a), Some(b)) => b.cmp(a).then_with(|| self.name.cmp(&other.name)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.name.cmp(&other.name),
        }
    }
}

/// Strips the two-part archive suffix from a file name.
///
/// `zig-linux-x86_64-0.14.0.tar.xz` becomes `zig-linux-x86_64-0.14.0`. Each
/// step removes only the last extension, so dots inside the version survive.
#[must_use]
pub fn install_dir_name(archive_filename: &str) -> String {
    let once = Path::new(archive_filename)
        .file_stem()
        .unwrap_or_else(|| OsStr::new(archive_filename));
    let twice = Path::new(once).file_stem().unwrap_or(once);
    twice.to_string_lossy().into_owned()
}

/// Extracts the semantic version embedded in an install directory name.
///
/// Tries every suffix that starts right after a `-`, so the platform part of
/// the name is skipped: `zig-linux-x86_64-0.14.0-dev.2+abc` yields
/// `0.14.0-dev.2+abc`.
#[must_use]
pub fn version_from_dir_name(name: &str) -> Option<Version> {
    name.match_indices('-')
        .map(|(i, _)| &name[i + 1..])
        .find_map(|candidate| Version::parse(candidate).ok())
}

impl ToolchainPaths {
    /// Creates paths from run settings.
    #[must_use = "returns new paths instance without side effects"]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            downloads: settings.download_dir.clone(),
            toolchains: settings.install_dir.clone(),
            bin: settings.bin_dir.clone(),
            binary_name: settings.binary_name.clone(),
        }
    }

    /// Returns the cache path for a downloaded archive.
    #[must_use = "returns the path without side effects"]
    pub fn download_path(&self, filename: &str) -> PathBuf {
        self.downloads.join(filename)
    }

    /// Returns the install directory for an archive.
    #[must_use = "returns the path without side effects"]
    pub fn install_path(&self, archive_filename: &str) -> PathBuf {
        self.toolchains.join(install_dir_name(archive_filename))
    }

    /// Returns the executable inside the install directory of an archive.
    #[must_use = "returns the path without side effects"]
    pub fn binary_path(&self, archive_filename: &str) -> PathBuf {
        self.install_path(archive_filename).join(&self.binary_name)
    }

    /// Returns the path of the active symlink.
    #[must_use = "returns the path without side effects"]
    pub fn symlink_path(&self) -> PathBuf {
        self.bin.join(&self.binary_name)
    }

    /// Ensures the download, install and bin directories exist.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.downloads, &self.toolchains, &self.bin] {
            std::fs::create_dir_all(dir)
                .io_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Points the active symlink at `target`.
    ///
    /// The new link is created under a temporary name next to the old one and
    /// renamed over it, so the symlink path always exists. `target` does not
    /// have to exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary link cannot be created or renamed,
    /// for example when the symlink path is occupied by a directory.
    pub fn swap_symlink(&self, target: &Path) -> Result<()> {
        let link = self.symlink_path();
        let temp_link = self
            .bin
            .join(format!(".{}.tmp-{}", self.binary_name, std::process::id()));

        if temp_link.symlink_metadata().is_ok() {
            std::fs::remove_file(&temp_link).io_context(|| {
                format!("Failed to remove stale link: {}", temp_link.display())
            })?;
        }

        create_link(target, &temp_link)?;

        if let Err(e) = std::fs::rename(&temp_link, &link) {
            let _ = std::fs::remove_file(&temp_link);
            return Err(NightlyError::io(
                format!(
                    "Failed to replace {} with link to {}",
                    link.display(),
                    target.display()
                ),
                e,
            ));
        }

        debug!(link = %link.display(), target = %target.display(), "symlink updated");
        Ok(())
    }

    /// Returns where the active symlink points, or `None` if there is no link.
    #[must_use = "returns the target without side effects"]
    pub fn active_target(&self) -> Option<PathBuf> {
        std::fs::read_link(self.symlink_path()).ok()
    }

    /// Returns the install directory name the active symlink points into.
    #[must_use = "returns the name without side effects"]
    pub fn active_install(&self) -> Option<String> {
        let target = self.active_target()?;
        let relative = target.strip_prefix(&self.toolchains).ok()?;
        relative
            .components()
            .next()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
    }

    /// Returns true if the active symlink already points at the executable of
    /// `archive_filename`'s install directory.
    #[must_use = "returns the result without side effects"]
    pub fn is_active(&self, archive_filename: &str) -> bool {
        self.active_target()
            .is_some_and(|target| target == self.binary_path(archive_filename))
    }

    /// Lists install directories, newest version first.
    ///
    /// # Errors
    ///
    /// Returns an error if the install root exists but cannot be read.
    pub fn list_installed(&self) -> Result<Vec<InstalledToolchain>> {
        if !self.toolchains.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.toolchains).io_context(|| {
            format!(
                "Failed to read install directory: {}",
                self.toolchains.display()
            )
        })?;

        let mut installed = Vec::new();
        for entry in entries {
            let entry = entry.io_context(|| "Failed to read directory entry")?;
            let path = entry.path();
            if path.is_dir()
                && let Some(name) = path.file_name()
                && let Some(name_str) = name.to_str()
            {
                installed.push(InstalledToolchain::new(name_str.to_string()));
            }
        }

        installed.sort_by(InstalledToolchain::newest_first);
        Ok(installed)
    }
}

/// Creates a symbolic link at `link` pointing to `target`.
fn create_link(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    let created = std::os::unix::fs::symlink(target, link);

    #[cfg(windows)]
    let created = std::os::windows::fs::symlink_file(target, link);

    created.io_context(|| {
        format!(
            "Failed to create symlink {} -> {}",
            link.display(),
            target.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;

    const ARCHIVE: &str = "zig-linux-x86_64-0.14.0-dev.2+0884a4341.tar.xz";

    fn paths_in(temp: &TempDir) -> ToolchainPaths {
        ToolchainPaths::from_settings(&Settings::with_root(
            temp.path(),
            "http://localhost/index.json",
        ))
    }

    #[test]
    fn install_dir_name_strips_two_suffixes() {
        assert_eq!(install_dir_name("foo-bar.tar.xz"), "foo-bar");
        assert_eq!(
            install_dir_name(ARCHIVE),
            "zig-linux-x86_64-0.14.0-dev.2+0884a4341"
        );
        assert_eq!(install_dir_name("zig.tar.gz"), "zig");
    }

    #[test]
    fn version_from_dir_name_skips_platform() {
        assert_eq!(
            version_from_dir_name("zig-linux-x86_64-0.14.0-dev.2+0884a4341"),
            Some(Version::parse("0.14.0-dev.2+0884a4341").unwrap())
        );
        assert_eq!(
            version_from_dir_name("zig-x86_64-linux-0.13.0"),
            Some(Version::new(0, 13, 0))
        );
        assert_eq!(version_from_dir_name("my-custom-zig"), None);
    }

    #[test]
    fn paths_follow_settings() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(&temp);

        assert_eq!(
            paths.download_path(ARCHIVE),
            temp.path().join("downloads").join(ARCHIVE)
        );
        assert_eq!(
            paths.binary_path(ARCHIVE),
            temp.path()
                .join("zigs")
                .join("zig-linux-x86_64-0.14.0-dev.2+0884a4341")
                .join("zig")
        );
        assert_eq!(paths.symlink_path(), temp.path().join("bin").join("zig"));
    }

    #[test]
    fn ensure_directories_creates_all() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(&temp);

        paths.ensure_directories().unwrap();

        assert!(paths.downloads.is_dir());
        assert!(paths.toolchains.is_dir());
        assert!(paths.bin.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn swap_symlink_creates_and_replaces_link() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(&temp);
        paths.ensure_directories().unwrap();

        let old = paths.binary_path("zig-linux-x86_64-0.13.0.tar.xz");
        let new = paths.binary_path(ARCHIVE);

        paths.swap_symlink(&old).unwrap();
        assert_eq!(paths.active_target(), Some(old));

        paths.swap_symlink(&new).unwrap();
        assert_eq!(paths.active_target(), Some(new));
        assert!(paths.is_active(ARCHIVE));
        assert!(!paths.is_active("zig-linux-x86_64-0.13.0.tar.xz"));

        let leftovers: Vec<_> = std::fs::read_dir(&paths.bin)
            .unwrap()
            .filter_map(std::result::Result::ok)
            .map(|e| e.file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("zig")]);
    }

    #[cfg(unix)]
    #[test]
    fn swap_symlink_fails_over_directory() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(&temp);
        paths.ensure_directories().unwrap();
        std::fs::create_dir(paths.symlink_path()).unwrap();

        let result = paths.swap_symlink(&paths.binary_path(ARCHIVE));

        assert!(result.is_err());
        assert!(paths.symlink_path().is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn active_install_names_target_directory() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(&temp);
        paths.ensure_directories().unwrap();

        assert_eq!(paths.active_install(), None);

        paths.swap_symlink(&paths.binary_path(ARCHIVE)).unwrap();
        assert_eq!(
            paths.active_install().as_deref(),
            Some("zig-linux-x86_64-0.14.0-dev.2+0884a4341")
        );
    }

    #[test]
    fn list_installed_returns_empty_without_install_root() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(&temp);

        assert!(paths.list_installed().unwrap().is_empty());
    }

    #[test]
    fn list_installed_sorts_newest_first() {
        let temp = TempDir::new().unwrap();
        let paths = paths_in(&temp);
        for name in [
            "zig-linux-x86_64-0.13.0",
            "zig-linux-x86_64-0.14.0-dev.10+aaaa",
            "custom",
            "zig-linux-x86_64-0.14.0-dev.2+bbbb",
            "zig-linux-x86_64-0.14.0",
        ] {
            std::fs::create_dir_all(paths.toolchains.join(name)).unwrap();
        }
        std::fs::write(paths.toolchains.join("notes.txt"), "not a toolchain").unwrap();

        let names: Vec<String> = paths
            .list_installed()
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();

        assert_eq!(
            names,
            [
                "zig-linux-x86_64-0.14.0",
                "zig-linux-x86_64-0.14.0-dev.10+aaaa",
                "zig-linux-x86_64-0.14.0-dev.2+bbbb",
                "zig-linux-x86_64-0.13.0",
                "custom",
            ]
        );
    }
}
