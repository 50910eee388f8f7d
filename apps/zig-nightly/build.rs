//! Build script for zig-nightly.
//!
//! Sets compile-time environment variables for version information.

use std::process::Command;

fn main() {
    let commit = get_git_commit();
    println!("cargo:rustc-env=ZIG_NIGHTLY_GIT_COMMIT={commit}");

    // Path relative to the repository root
    if let Some(repo_root) = get_repo_root() {
        println!("cargo:rerun-if-changed={repo_root}/.git/HEAD");
    }
}

/// Gets the repository root directory.
fn get_repo_root() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!path.is_empty()).then_some(path)
}

/// Gets the short git commit hash, or `unknown` outside a git checkout.
fn get_git_commit() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
