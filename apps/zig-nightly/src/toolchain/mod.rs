//! Nightly toolchain management for zig-nightly.
//!
//! ## Module Structure
//!
//! - [`index`] - Version index fetching and build selection
//! - [`download`] - Archive download into the cache directory
//! - [`verify`] - Size and SHA256 verification
//! - [`archive`] - Filtered tarball extraction
//! - [`paths`] - Install layout and the active symlink

pub mod archive;
pub mod download;
pub mod index;
pub mod paths;
pub mod verify;

pub use archive::extract_archive;
pub use download::{DownloadOutcome, fetch_archive};
pub use index::fetch_nightly;
pub use paths::ToolchainPaths;
pub use verify::verify_archive;
