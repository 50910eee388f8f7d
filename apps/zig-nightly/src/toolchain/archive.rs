//! Archive extraction for zig-nightly.
//!
//! Zig publishes `.tar.xz` tarballs; `.tar.gz` is accepted as well. Entries are
//! unpacked into the install root through a filter that keeps every write
//! inside that root:
//!
//! - absolute paths and `..` components are rejected
//! - device nodes and FIFOs are rejected
//! - symlinks must resolve inside the root; hard links must be relative
//!   without `..`
//! - ownership and extended attributes are never restored
//! - permission bits are reduced to what a user-owned toolchain needs
//!
//! The first rejected entry aborts extraction.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::{Archive, Entry, EntryType};
use tracing::debug;
use xz2::read::XzDecoder;

use crate::errors::{IoResultExt, NightlyError, Result};

/// Compression formats recognised by file suffix.
///
/// Only two-part suffixes are accepted, since the install directory name is
/// derived by stripping exactly two extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// `.tar.xz`
    Xz,
    /// `.tar.gz`
    Gzip,
}

impl Compression {
    /// Detects the compression format from the archive file name.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy();
        if name.ends_with(".tar.xz") {
            Some(Self::Xz)
        } else if name.ends_with(".tar.gz") {
            Some(Self::Gzip)
        } else {
            None
        }
    }
}

/// Extracts a compressed tarball into `dest_dir`.
///
/// Creates the destination directory if it does not exist. Entries land
/// relative to `dest_dir` exactly as named in the archive.
///
/// # Errors
///
/// Returns an error if:
/// - The archive suffix is not recognised
/// - The archive cannot be opened, decompressed or read
/// - An entry is rejected by the extraction filter
/// - Directory or file creation fails
pub fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let compression =
        Compression::from_path(archive_path).ok_or_else(|| NightlyError::UnsupportedArchive {
            path: archive_path.to_path_buf(),
        })?;

    let file = File::open(archive_path)
        .io_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let reader = BufReader::new(file);

    match compression {
        Compression::Xz => unpack_tar(XzDecoder::new(reader), archive_path, dest_dir),
        Compression::Gzip => unpack_tar(GzDecoder::new(reader), archive_path, dest_dir),
    }
}

fn unpack_tar<R: Read>(reader: R, archive_path: &Path, dest_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dest_dir)
        .io_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;
    let root = dest_dir
        .canonicalize()
        .io_context(|| format!("Failed to resolve directory: {}", dest_dir.display()))?;

    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(false);
    archive.set_preserve_ownerships(false);
    archive.set_unpack_xattrs(false);
    archive.set_overwrite(true);

    let mut count = 0usize;
    let mut symlinks = Vec::new();
    for entry in archive
        .entries()
        .io_context(|| format!("Failed to read tar entries: {}", archive_path.display()))?
    {
        let mut entry = entry
            .io_context(|| format!("Failed to read tar entry: {}", archive_path.display()))?;

        let entry_path = entry
            .path()
            .io_context(|| format!("Invalid entry path in {}", archive_path.display()))?
            .into_owned();

        check_entry(&entry, &entry_path, &root)?;

        let mode = entry
            .header()
            .mode()
            .io_context(|| format!("Invalid mode for {}", entry_path.display()))?;
        let entry_type = entry.header().entry_type();

        let unpacked = entry
            .unpack_in(&root)
            .io_context(|| format!("Failed to extract: {}", entry_path.display()))?;
        if !unpacked {
            return Err(NightlyError::unsafe_entry(
                entry_path.display().to_string(),
                "entry resolves outside the install directory",
            ));
        }

        if entry_type == EntryType::Symlink {
            symlinks.push((entry_path.clone(), link_target(&entry, &entry_path)?));
        }
        if let Some(mode) = sanitized_mode(entry_type, mode) {
            apply_mode(&root.join(&entry_path), mode)?;
        }
        count += 1;
    }

    // A later entry can change what an earlier link resolves through, so
    // every link is checked again against the finished tree.
    for (entry_path, target) in &symlinks {
        if let Err(e) = check_symlink(entry_path, target, &root) {
            let _ = std::fs::remove_file(root.join(entry_path));
            return Err(e);
        }
    }

    debug!(entries = count, dest = %root.display(), "archive extracted");
    Ok(())
}

/// Applies the extraction filter to a single entry.
fn check_entry<R: Read>(entry: &Entry<'_, R>, entry_path: &Path, root: &Path) -> Result<()> {
    let display = || entry_path.display().to_string();

    if entry_path.has_root() || entry_path.is_absolute() {
        return Err(NightlyError::unsafe_entry(display(), "absolute path"));
    }
    if has_parent_component(entry_path) {
        return Err(NightlyError::unsafe_entry(display(), "path contains '..'"));
    }

    match entry.header().entry_type() {
        EntryType::Block | EntryType::Char => {
            Err(NightlyError::unsafe_entry(display(), "device node"))
        }
        EntryType::Fifo => Err(NightlyError::unsafe_entry(display(), "FIFO")),
        EntryType::Symlink => check_symlink(entry_path, &link_target(entry, entry_path)?, root),
        EntryType::Link => {
            let target = link_target(entry, entry_path)?;
            if target.has_root() || has_parent_component(&target) {
                return Err(NightlyError::unsafe_entry(
                    display(),
                    format!("hard link to {}", target.display()),
                ));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Fails unless the link at `entry_path` resolves inside `root`, following
/// whatever already exists on disk.
fn check_symlink(entry_path: &Path, target: &Path, root: &Path) -> Result<()> {
    if target.has_root() {
        return Err(NightlyError::unsafe_entry(
            entry_path.display().to_string(),
            format!("symlink to absolute path {}", target.display()),
        ));
    }
    let parent = entry_path.parent().unwrap_or_else(|| Path::new(""));
    let resolved = resolve_lenient(&root.join(parent).join(target));
    if !resolved.starts_with(root) {
        return Err(NightlyError::unsafe_entry(
            entry_path.display().to_string(),
            format!(
                "symlink target {} is outside the install directory",
                target.display()
            ),
        ));
    }
    Ok(())
}

fn link_target<R: Read>(entry: &Entry<'_, R>, entry_path: &Path) -> Result<PathBuf> {
    let target = entry
        .link_name()
        .io_context(|| format!("Invalid link target for {}", entry_path.display()))?;
    target.map(Cow::into_owned).ok_or_else(|| {
        NightlyError::unsafe_entry(entry_path.display().to_string(), "link without a target")
    })
}

fn has_parent_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Resolves `path` through whatever part of it already exists on disk.
///
/// The longest existing prefix is canonicalized (following symlinks extracted
/// earlier); the remaining components are applied lexically.
fn resolve_lenient(path: &Path) -> PathBuf {
    let components: Vec<Component<'_>> = path.components().collect();

    for split in (1..=components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        if let Ok(mut resolved) = prefix.canonicalize() {
            for component in &components[split..] {
                match component {
                    Component::ParentDir => {
                        resolved.pop();
                    }
                    Component::Normal(name) => resolved.push(name),
                    _ => {}
                }
            }
            return resolved;
        }
    }
    path.to_path_buf()
}

/// Permission bits to apply after unpacking, or `None` to leave the entry as is.
///
/// Regular files keep at most `rwxr-xr-x`, always get owner read/write, and
/// lose group/other execute when the owner cannot execute. Directories keep at
/// most `rwxr-xr-x` and always get full owner access. Special bits are cleared.
#[must_use]
pub fn sanitized_mode(entry_type: EntryType, mode: u32) -> Option<u32> {
    match entry_type {
        EntryType::Regular | EntryType::Continuous => {
            let mut mode = mode & 0o755;
            if mode & 0o100 == 0 {
                mode &= !0o111;
            }
            Some(mode | 0o600)
        }
        EntryType::Directory => Some((mode & 0o755) | 0o700),
        _ => None,
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .io_context(|| format!("Failed to set permissions: {}", path.display()))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn apply_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
