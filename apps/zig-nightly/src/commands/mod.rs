//! Command modules for the zig-nightly CLI.
//!
//! - [`update`] - Download, verify and activate the latest nightly (default)
//! - [`check`] - Report whether a newer nightly is available
//! - [`list`] - List installed builds
//! - [`version`] - Display version information

pub mod check;
pub mod list;
pub mod update;
pub mod version;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::config::Settings;

/// Options shared by every subcommand.
///
/// Each flag overrides the matching `ZIG_NIGHTLY_*` environment variable.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// URL of the JSON version index.
    #[clap(long, global = true, value_name = "URL")]
    pub index_url: Option<String>,

    /// Channel to install from (e.g. "master").
    #[clap(long, global = true)]
    pub channel: Option<String>,

    /// Platform identifier inside the channel (e.g. "x86_64-linux").
    #[clap(long, global = true)]
    pub platform: Option<String>,

    /// Directory where tarballs are downloaded.
    #[clap(long, global = true, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Directory where builds are extracted.
    #[clap(long, global = true, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Directory holding the zig symlink.
    #[clap(long, global = true, value_name = "DIR")]
    pub bin_dir: Option<PathBuf>,

    /// Per-request timeout in seconds. No timeout by default.
    #[clap(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print debug diagnostics to stderr.
    #[clap(short = 'v', long, global = true, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Resolves settings from the environment, then applies these flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is needed and cannot be
    /// determined, or if a relative directory cannot be made absolute.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = Settings::from_env()?;
        self.apply(&mut settings);
        settings.resolve_directories()?;
        Ok(settings)
    }

    fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.index_url {
            settings.index_url.clone_from(url);
        }
        if let Some(channel) = &self.channel {
            settings.channel.clone_from(channel);
        }
        if let Some(platform) = &self.platform {
            settings.platform.clone_from(platform);
        }
        if let Some(dir) = &self.download_dir {
            settings.download_dir.clone_from(dir);
        }
        if let Some(dir) = &self.install_dir {
            settings.install_dir.clone_from(dir);
        }
        if let Some(dir) = &self.bin_dir {
            settings.bin_dir.clone_from(dir);
        }
        if let Some(secs) = self.timeout {
            settings.timeout = Some(Duration::from_secs(secs));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn flags_override_settings() {
        let mut settings = Settings::with_root(Path::new("/tmp/base"), "http://a/index.json");
        let args = GlobalArgs {
            index_url: Some("http://b/index.json".to_string()),
            channel: Some("0.13.0".to_string()),
            install_dir: Some(PathBuf::from("/opt/zigs")),
            timeout: Some(30),
            ..GlobalArgs::default()
        };

        args.apply(&mut settings);

        assert_eq!(settings.index_url, "http://b/index.json");
        assert_eq!(settings.channel, "0.13.0");
        assert_eq!(settings.platform, "x86_64-linux");
        assert_eq!(settings.install_dir, PathBuf::from("/opt/zigs"));
        assert_eq!(settings.download_dir, PathBuf::from("/tmp/base/downloads"));
        assert_eq!(settings.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn no_flags_leave_settings_untouched() {
        let mut settings = Settings::with_root(Path::new("/tmp/base"), "http://a/index.json");
        let before = settings.clone();

        GlobalArgs::default().apply(&mut settings);

        assert_eq!(settings, before);
    }
}
