use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Sentinel context when no reviewable diff exists
pub const NO_DIFF: &str = "No diff available";

/// Review diffs are truncated to this many lines
const DIFF_MAX_LINES: usize = 500;

/// Short hash of the checked-out commit, or "unknown" outside a repository
pub fn short_commit_hash(repo: &Path) -> String {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(repo)
        .output();
    match output {
        Ok(out) if out.status.success() => {
            String::from_utf8_lossy(&out.stdout).trim().to_string()
        }
        _ => "unknown".to_string(),
    }
}

fn build_globset(globs: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        match Glob::new(glob) {
            Ok(g) => {
                builder.add(g);
            }
            Err(e) => warn!("Ignoring invalid review glob '{}': {}", glob, e),
        }
    }
    builder.build().unwrap_or_else(|e| {
        warn!("Failed to build review glob set: {}", e);
        GlobSet::empty()
    })
}

/// Diff of the most recent commit, filtered to added/copied/modified/renamed
/// files matching `globs` and truncated to 500 lines.
///
/// Any git failure (root commit, not a repository) degrades to [`NO_DIFF`].
pub fn latest_commit_diff(repo: &Path, globs: &[String]) -> String {
    let names = Command::new("git")
        .args(["diff", "--name-only", "--diff-filter=ACMR", "HEAD~1", "HEAD"])
        .current_dir(repo)
        .output();
    let names = match names {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).to_string(),
        _ => return NO_DIFF.to_string(),
    };

    let globset = build_globset(globs);
    let files: Vec<String> = names
        .lines()
        .filter(|f| globset.is_match(f))
        .map(|f| f.to_string())
        .collect();
    debug!("{} changed files match the review globs", files.len());
    if files.is_empty() {
        return NO_DIFF.to_string();
    }

    let mut diff = String::new();
    for file in &files {
        if let Ok(output) = Command::new("git")
            .args(["diff", "HEAD~1", "HEAD", "--", file])
            .current_dir(repo)
            .output()
        {
            if output.status.success() {
                diff.push_str(&String::from_utf8_lossy(&output.stdout));
            }
        }
    }
    if diff.trim().is_empty() {
        return NO_DIFF.to_string();
    }

    truncate_lines(&diff, DIFF_MAX_LINES)
}

fn truncate_lines(text: &str, max_lines: usize) -> String {
    let mut result: String = text
        .lines()
        .take(max_lines)
        .map(|l| format!("{}\n", l))
        .collect();
    if text.lines().count() > max_lines {
        result.push_str("[diff truncated]\n");
    }
    result
}
