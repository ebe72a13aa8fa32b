//! Stale-file cleanup for the uploads root.
//!
//! Sweeps the root plus its `thumbnails/` and `results/` subfolders,
//! deleting files whose age reaches the cutoff. The access marker is always
//! kept, as is anything matching a user-supplied exclude glob. Dry-run
//! reports what would be deleted without touching anything.

use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use regex::Regex;
use serde::Serialize;
use tryon_core::constants::{ACCESS_MARKER_FILE, RESULTS_SUBDIR, THUMBNAILS_SUBDIR};

#[derive(Debug, Default, Serialize)]
pub struct CleanupReport {
    pub deleted_count: u64,
    pub bytes_freed: u64,
}

/// Compile a shell-style glob (`*`, `?`) into an anchored regex.
pub fn glob_to_regex(pattern: &str) -> anyhow::Result<Regex> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    translated.push('^');
    for c in pattern.chars() {
        match c {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            c if "\\.+()[]{}|^$".contains(c) => {
                translated.push('\\');
                translated.push(c);
            }
            c => translated.push(c),
        }
    }
    translated.push('$');
    Regex::new(&translated).with_context(|| format!("invalid exclude pattern: {pattern}"))
}

pub async fn cleanup(
    root: &Path,
    max_age: Duration,
    exclude_patterns: &[String],
    dry_run: bool,
) -> anyhow::Result<CleanupReport> {
    let excludes = exclude_patterns
        .iter()
        .map(|p| glob_to_regex(p))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut report = CleanupReport::default();
    for dir in [
        root.to_path_buf(),
        root.join(THUMBNAILS_SUBDIR),
        root.join(RESULTS_SUBDIR),
    ] {
        if !dir.is_dir() {
            continue;
        }
        sweep_dir(&dir, max_age, &excludes, dry_run, &mut report).await?;
    }

    tracing::info!(
        deleted_count = report.deleted_count,
        bytes_freed = report.bytes_freed,
        dry_run,
        "cleanup finished"
    );
    Ok(report)
}

async fn sweep_dir(
    dir: &Path,
    max_age: Duration,
    excludes: &[Regex],
    dry_run: bool,
    report: &mut CleanupReport,
) -> anyhow::Result<()> {
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to read {}", dir.display()))?;

    while let Some(entry) = read_dir.next_entry().await? {
        let meta = match entry.metadata().await {
            Ok(meta) if meta.is_file() => meta,
            _ => continue,
        };
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if name == ACCESS_MARKER_FILE {
            continue;
        }
        if excludes.iter().any(|re| re.is_match(&name)) {
            tracing::debug!(name = %name, "excluded from cleanup");
            continue;
        }

        let age = meta
            .modified()
            .ok()
            .and_then(|m| SystemTime::now().duration_since(m).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        let path = entry.path();
        if dry_run {
            tracing::info!(path = %path.display(), age_secs = age.as_secs(), "would delete");
        } else {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %e, "failed to delete");
                continue;
            }
            tracing::info!(path = %path.display(), age_secs = age.as_secs(), "deleted");
        }
        report.deleted_count += 1;
        report.bytes_freed += meta.len();
    }

    Ok(())
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seed_root(root: &Path) {
        std::fs::create_dir_all(root.join(THUMBNAILS_SUBDIR)).unwrap();
        std::fs::create_dir_all(root.join(RESULTS_SUBDIR)).unwrap();
        std::fs::write(root.join(ACCESS_MARKER_FILE), b"deny from all\n").unwrap();
        std::fs::write(root.join("user_a.jpg"), b"aaaa").unwrap();
        std::fs::write(root.join("jewel_b.png"), b"bb").unwrap();
        std::fs::write(root.join(THUMBNAILS_SUBDIR).join("thumb_user_a.jpg"), b"t").unwrap();
        std::fs::write(root.join(RESULTS_SUBDIR).join("user_a-jewel_b.png"), b"rrr").unwrap();
    }

    #[test]
    fn test_glob_translation() {
        let re = glob_to_regex("thumb_*.jpg").unwrap();
        assert!(re.is_match("thumb_user_a.jpg"));
        assert!(!re.is_match("user_a.jpg"));
        assert!(!re.is_match("thumb_user_a.jpg.bak"));

        let re = glob_to_regex("user_?.png").unwrap();
        assert!(re.is_match("user_a.png"));
        assert!(!re.is_match("user_ab.png"));

        // Regex metacharacters in the pattern are literal.
        let re = glob_to_regex("a.b").unwrap();
        assert!(re.is_match("a.b"));
        assert!(!re.is_match("axb"));
    }

    #[tokio::test]
    async fn test_cleanup_sweeps_all_folders_but_keeps_marker() {
        let dir = tempdir().unwrap();
        seed_root(dir.path());

        let report = cleanup(dir.path(), Duration::ZERO, &[], false).await.unwrap();

        assert_eq!(report.deleted_count, 4);
        assert_eq!(report.bytes_freed, 4 + 2 + 1 + 3);
        assert!(dir.path().join(ACCESS_MARKER_FILE).is_file());
        assert!(!dir.path().join("user_a.jpg").exists());
        assert!(!dir.path().join(RESULTS_SUBDIR).join("user_a-jewel_b.png").exists());
    }

    #[tokio::test]
    async fn test_cleanup_honors_exclude_patterns() {
        let dir = tempdir().unwrap();
        seed_root(dir.path());

        let excludes = vec!["*.png".to_string()];
        let report = cleanup(dir.path(), Duration::ZERO, &excludes, false).await.unwrap();

        // Both .png files survive, in the root and in results/.
        assert_eq!(report.deleted_count, 2);
        assert!(dir.path().join("jewel_b.png").is_file());
        assert!(dir.path().join(RESULTS_SUBDIR).join("user_a-jewel_b.png").is_file());
        assert!(!dir.path().join("user_a.jpg").exists());
    }

    #[tokio::test]
    async fn test_dry_run_reports_without_deleting() {
        let dir = tempdir().unwrap();
        seed_root(dir.path());

        let report = cleanup(dir.path(), Duration::ZERO, &[], true).await.unwrap();

        assert_eq!(report.deleted_count, 4);
        assert!(dir.path().join("user_a.jpg").is_file());
        assert!(dir.path().join("jewel_b.png").is_file());
    }

    #[tokio::test]
    async fn test_fresh_files_survive_a_long_cutoff() {
        let dir = tempdir().unwrap();
        seed_root(dir.path());

        let report = cleanup(dir.path(), Duration::from_secs(3600), &[], false)
            .await
            .unwrap();

        assert_eq!(report.deleted_count, 0);
        assert!(dir.path().join("user_a.jpg").is_file());
    }

    #[test]
    fn test_bracket_pattern_is_literal_not_a_character_class() {
        let re = glob_to_regex("[abc]").unwrap();
        assert!(re.is_match("[abc]"));
        assert!(!re.is_match("a"));
    }
}
