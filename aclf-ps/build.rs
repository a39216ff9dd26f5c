//! Build stamp for aclf-ps
//!
//! Exports three compile-time variables read by `api::health::BuildInfo`:
//! `ACLF_REVISION` (`git describe`, `-dirty` when the tree has edits),
//! `ACLF_BUILT_AT` (UTC, honours `SOURCE_DATE_EPOCH`) and `ACLF_PROFILE`.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, SecondsFormat, Utc};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    if let Some(git_dir) = git(&["rev-parse", "--absolute-git-dir"]).map(PathBuf::from) {
        watch_head(&git_dir);
    }

    let revision = git(&["describe", "--always", "--dirty", "--abbrev=8"])
        .unwrap_or_else(|| format!("v{}", env_or("CARGO_PKG_VERSION", "0.0.0")));

    println!("cargo:rustc-env=ACLF_REVISION={revision}");
    println!("cargo:rustc-env=ACLF_BUILT_AT={}", build_time());
    println!("cargo:rustc-env=ACLF_PROFILE={}", env_or("PROFILE", "unknown"));
}

/// Trimmed stdout of a successful, non-empty git invocation
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Rebuild when HEAD moves or the branch it names gets a new commit
fn watch_head(git_dir: &Path) {
    let head = git_dir.join("HEAD");
    println!("cargo:rerun-if-changed={}", head.display());

    let packed = git_dir.join("packed-refs");
    if packed.exists() {
        println!("cargo:rerun-if-changed={}", packed.display());
    }

    if let Ok(content) = std::fs::read_to_string(&head) {
        if let Some(reference) = content.trim().strip_prefix("ref: ") {
            let target = git_dir.join(reference);
            if target.exists() {
                println!("cargo:rerun-if-changed={}", target.display());
            }
        }
    }
}

fn build_time() -> String {
    let pinned = std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    pinned
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}
