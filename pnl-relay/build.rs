//! Stamp the binary with a build identifier for `/status`.
//!
//! Container and CI builds usually have no `.git`, so an explicit
//! `PNL_RELAY_BUILD_SHA` in the build environment wins over git.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const BUILD_SHA: &str = "PNL_RELAY_BUILD_SHA";

fn git_short_sha(repo: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["rev-parse", "--short=10", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

fn main() {
    println!("cargo:rerun-if-env-changed={BUILD_SHA}");

    let workspace = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .and_then(|dir| dir.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(".."));

    let head = workspace.join(".git").join("HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }

    let sha = env::var(BUILD_SHA)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| git_short_sha(&workspace))
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env={BUILD_SHA}={sha}");
}
