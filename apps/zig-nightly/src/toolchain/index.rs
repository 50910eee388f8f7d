//! Version index handling for zig-nightly.
//!
//! The Zig project publishes a single JSON document describing every release
//! channel. Only one channel/platform pair is of interest per run.
//!
//! ## Index Format
//!
//! ```json
//! {
//!   "master": {
//!     "version": "0.14.0-dev.2+0884a4341",
//!     "date": "2024-06-07",
//!     "docs": "https://ziglang.org/documentation/master/",
//!     "stdDocs": "https://ziglang.org/documentation/master/std/",
//!     "x86_64-linux": {
//!       "tarball": "https://ziglang.org/builds/zig-linux-x86_64-0.14.0-dev.2+0884a4341.tar.xz",
//!       "shasum": "9e2b1...",
//!       "size": "47441696"
//!     }
//!   },
//!   "0.13.0": { "date": "2024-06-07", "x86_64-linux": { ... } }
//! }
//! ```
//!
//! Release channels omit `version`. `size` is published as a decimal string.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Settings;
use crate::errors::{NightlyError, Result};

/// User-Agent header for HTTP requests.
const USER_AGENT: &str = concat!("zig-nightly/", env!("CARGO_PKG_VERSION"));

/// Parsed version index: channel name to channel record.
pub type Index = serde_json::Map<String, Value>;

/// Download information for one platform.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    /// Download URL of the tarball.
    pub tarball: String,
    /// Expected SHA256 digest as hex.
    pub shasum: String,
    /// Expected size in bytes.
    #[serde(deserialize_with = "deserialize_size")]
    pub size: u64,
}

impl Artifact {
    /// Extracts the archive filename from the tarball URL (last path segment).
    ///
    /// Example: `"https://.../zig-linux-x86_64-0.14.0.tar.xz"` -> `"zig-linux-x86_64-0.14.0.tar.xz"`
    #[must_use]
    pub fn filename(&self) -> &str {
        self.tarball.rsplit('/').next().unwrap_or(&self.tarball)
    }
}

/// Accepts the size either as a JSON integer or as a decimal string.
fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawSize {
        Bytes(u64),
        Text(String),
    }

    match RawSize::deserialize(deserializer)? {
        RawSize::Bytes(n) => Ok(n),
        RawSize::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid size '{s}'"))),
    }
}

/// The fields of a channel record that matter here.
///
/// Platform entries sit next to the metadata keys, so everything else is
/// collected into `targets`.
#[derive(Debug, Deserialize)]
struct ChannelRecord {
    version: Option<String>,
    date: Option<String>,
    docs: Option<String>,
    #[serde(rename = "stdDocs")]
    std_docs: Option<String>,
    #[serde(flatten)]
    targets: BTreeMap<String, Value>,
}

/// The selected build: channel metadata plus the platform artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct NightlyBuild {
    /// Channel the build was taken from.
    pub channel: String,
    /// Platform identifier of the artifact.
    pub platform: String,
    /// Human-readable version label, if the channel publishes one.
    pub version: Option<String>,
    /// Build date.
    pub date: Option<String>,
    /// Language reference URL.
    pub docs: Option<String>,
    /// Standard library docs URL.
    pub std_docs: Option<String>,
    /// The platform artifact.
    pub artifact: Artifact,
    /// The platform record exactly as published, for display.
    raw_artifact: Value,
}

/// Console summary of a build, serialized as pretty JSON.
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    docs: Option<&'a str>,
    #[serde(rename = "stdDocs", skip_serializing_if = "Option::is_none")]
    std_docs: Option<&'a str>,
    #[serde(flatten)]
    artifact: BTreeMap<&'a str, &'a Value>,
}

impl NightlyBuild {
    /// Version label for messages, falling back to the channel name.
    #[must_use]
    pub fn label(&self) -> &str {
        self.version.as_deref().unwrap_or(&self.channel)
    }

    /// Returns the console summary for this build.
    #[must_use]
    pub fn summary(&self) -> Summary<'_> {
        Summary {
            version: self.version.as_deref(),
            date: self.date.as_deref(),
            docs: self.docs.as_deref(),
            std_docs: self.std_docs.as_deref(),
            artifact: BTreeMap::from([(self.platform.as_str(), &self.raw_artifact)]),
        }
    }

    /// Renders the summary as indented JSON.
    #[must_use]
    pub fn summary_json(&self) -> String {
        // Serializing borrowed strings and JSON values cannot fail.
        serde_json::to_string_pretty(&self.summary()).unwrap_or_default()
    }
}

/// Selects the build for `channel` and `platform` from a parsed index.
///
/// # Errors
///
/// Returns an error if:
/// - The channel key is absent
/// - The platform key is absent from the channel record
/// - The channel or platform record has missing or malformed fields
pub fn select_nightly(index: &Index, channel: &str, platform: &str) -> Result<NightlyBuild> {
    let channel_value = index
        .get(channel)
        .ok_or_else(|| NightlyError::ChannelNotFound {
            channel: channel.to_string(),
        })?;

    let mut record = ChannelRecord::deserialize(channel_value)
        .map_err(|e| NightlyError::malformed_record(channel, e.to_string()))?;

    let raw_artifact =
        record
            .targets
            .remove(platform)
            .ok_or_else(|| NightlyError::PlatformNotFound {
                channel: channel.to_string(),
                platform: platform.to_string(),
            })?;

    let artifact = Artifact::deserialize(&raw_artifact)
        .map_err(|e| NightlyError::malformed_record(platform, e.to_string()))?;

    if artifact.filename().is_empty() {
        return Err(NightlyError::malformed_record(
            platform,
            format!("tarball URL '{}' has no file name", artifact.tarball),
        ));
    }

    Ok(NightlyBuild {
        channel: channel.to_string(),
        platform: platform.to_string(),
        version: record.version,
        date: record.date,
        docs: record.docs,
        std_docs: record.std_docs,
        artifact,
        raw_artifact,
    })
}

/// Builds the HTTP client shared by index and archive requests.
pub(crate) fn http_client(url: &str, timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| NightlyError::transport(url, e))
}

/// Fetches and parses the version index.
///
/// # Errors
///
/// Returns an error if:
/// - The HTTP request fails or the body cannot be read
/// - The server returns a non-success status code
/// - The response is not a JSON object
pub async fn fetch_index(settings: &Settings) -> Result<Index> {
    let url = settings.index_url.as_str();
    let client = http_client(url, settings.timeout)?;

    debug!(url, "fetching version index");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| NightlyError::transport(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(NightlyError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| NightlyError::transport(url, e))?;
    debug!(bytes = body.len(), "received version index");

    serde_json::from_slice(&body).map_err(|source| NightlyError::MalformedIndex {
        url: url.to_string(),
        source,
    })
}

/// Fetches the index and selects the configured channel and platform.
///
/// # Errors
///
/// Returns any error from [`fetch_index`] or [`select_nightly`].
pub async fn fetch_nightly(settings: &Settings) -> Result<NightlyBuild> {
    let index = fetch_index(settings).await?;
    let build = select_nightly(&index, &settings.channel, &settings.platform)?;
    debug!(
        version = build.label(),
        tarball = build.artifact.tarball,
        "selected build"
    );
    Ok(build)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index_json() -> &'static str {
        r#"{
            "master": {
                "version": "0.14.0-dev.2+0884a4341",
                "date": "2024-06-07",
                "docs": "https://ziglang.org/documentation/master/",
                "stdDocs": "https://ziglang.org/documentation/master/std/",
                "src": {
                    "tarball": "https://ziglang.org/builds/zig-0.14.0-dev.2+0884a4341.tar.xz",
                    "shasum": "aaaa",
                    "size": "17000000"
                },
                "x86_64-linux": {
                    "tarball": "https://ziglang.org/builds/zig-linux-x86_64-0.14.0-dev.2+0884a4341.tar.xz",
                    "shasum": "9e2b1bb3aa1c4f3d8e7d4f3c6f1d2b8a9c0e1f2a3b4c5d6e7f8091a2b3c4d5e6",
                    "size": "47441696"
                },
                "aarch64-macos": {
                    "tarball": "https://ziglang.org/builds/zig-macos-aarch64-0.14.0-dev.2+0884a4341.tar.xz",
                    "shasum": "bbbb",
                    "size": 43000000
                }
            },
            "0.13.0": {
                "date": "2024-06-07",
                "x86_64-linux": {
                    "tarball": "https://ziglang.org/download/0.13.0/zig-linux-x86_64-0.13.0.tar.xz",
                    "shasum": "cccc",
                    "size": "47082308"
                }
            }
        }"#
    }

    fn sample_index() -> Index {
        serde_json::from_str(sample_index_json()).expect("Should parse index")
    }

    #[test]
    fn select_nightly_returns_master_metadata() {
        let build = select_nightly(&sample_index(), "master", "x86_64-linux").unwrap();

        assert_eq!(build.version.as_deref(), Some("0.14.0-dev.2+0884a4341"));
        assert_eq!(build.date.as_deref(), Some("2024-06-07"));
        assert_eq!(
            build.std_docs.as_deref(),
            Some("https://ziglang.org/documentation/master/std/")
        );
        assert_eq!(build.artifact.size, 47_441_696);
        assert_eq!(
            build.artifact.filename(),
            "zig-linux-x86_64-0.14.0-dev.2+0884a4341.tar.xz"
        );
    }

    #[test]
    fn select_nightly_accepts_integer_size() {
        let build = select_nightly(&sample_index(), "master", "aarch64-macos").unwrap();
        assert_eq!(build.artifact.size, 43_000_000);
    }

    #[test]
    fn select_nightly_tolerates_missing_version() {
        let build = select_nightly(&sample_index(), "0.13.0", "x86_64-linux").unwrap();
        assert!(build.version.is_none());
        assert_eq!(build.label(), "0.13.0");
    }

    #[test]
    fn missing_channel_is_reported() {
        let err = select_nightly(&sample_index(), "nightly", "x86_64-linux").unwrap_err();
        assert!(matches!(err, NightlyError::ChannelNotFound { ref channel } if channel == "nightly"));
    }

    #[test]
    fn missing_platform_is_reported() {
        let err = select_nightly(&sample_index(), "master", "riscv64-linux").unwrap_err();
        assert!(matches!(err, NightlyError::PlatformNotFound { .. }));
        assert!(err.to_string().contains("riscv64-linux"));
    }

    #[test]
    fn record_without_shasum_is_malformed() {
        let index: Index = serde_json::from_str(
            r#"{"master": {"x86_64-linux": {"tarball": "https://x/zig.tar.xz", "size": "1"}}}"#,
        )
        .unwrap();
        let err = select_nightly(&index, "master", "x86_64-linux").unwrap_err();
        assert!(matches!(err, NightlyError::MalformedRecord { .. }));
        assert!(err.to_string().contains("shasum"));
    }

    #[test]
    fn non_numeric_size_is_malformed() {
        let index: Index = serde_json::from_str(
            r#"{"master": {"x86_64-linux": {"tarball": "https://x/zig.tar.xz", "shasum": "aa", "size": "big"}}}"#,
        )
        .unwrap();
        let err = select_nightly(&index, "master", "x86_64-linux").unwrap_err();
        assert!(matches!(err, NightlyError::MalformedRecord { .. }));
    }

    #[test]
    fn tarball_url_ending_in_slash_is_malformed() {
        let index: Index = serde_json::from_str(
            r#"{"master": {"x86_64-linux": {"tarball": "https://x/builds/", "shasum": "aa", "size": "1"}}}"#,
        )
        .unwrap();
        let err = select_nightly(&index, "master", "x86_64-linux").unwrap_err();
        assert!(err.to_string().contains("no file name"));
    }

    #[test]
    fn summary_contains_only_selected_fields() {
        let build = select_nightly(&sample_index(), "master", "x86_64-linux").unwrap();
        let summary: Value = serde_json::from_str(&build.summary_json()).unwrap();
        let object = summary.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["date", "docs", "stdDocs", "version", "x86_64-linux"]);
        assert_eq!(object["x86_64-linux"]["size"], "47441696");
    }

    #[test]
    fn summary_json_is_indented() {
        let build = select_nightly(&sample_index(), "master", "x86_64-linux").unwrap();
        assert!(build.summary_json().contains("\n  \"version\""));
    }
}
