//! Diagnostic logging setup.
//!
//! Status output for the user goes through `println!`. This subscriber only
//! carries `tracing` diagnostics, written to stderr so they never mix with the
//! JSON summary on stdout.
//!
//! `RUST_LOG` takes precedence; otherwise the level is `warn`, or `debug`
//! with `--verbose`.

use anyhow::{Context, Result};
use tracing_subscriber::{
    EnvFilter, Registry, fmt::layer, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Returns the filter used when `RUST_LOG` is unset or invalid.
fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

/// Builds the level filter from `RUST_LOG` or the verbosity flag.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(verbose: bool) -> Result<()> {
    Registry::default()
        .with(env_filter(verbose))
        .with(
            layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .try_init()
        .context("Failed to initialise logging")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_follows_verbosity() {
        assert_eq!(default_directive(false), "warn");
        assert_eq!(default_directive(true), "debug");
    }

    #[test]
    fn init_twice_reports_error() {
        // The first call may already have happened in another test thread.
        let _ = init(false);
        assert!(init(false).is_err());
    }
}
