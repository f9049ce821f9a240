//! Deletes rolled log files older than the retention window.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::logger::LOG_FILE_PREFIX;

/// Remove `medscribe.log*` files in `log_dir` last modified before the cutoff.
///
/// Returns the number of files deleted. A missing directory is not an error.
pub async fn cleanup_expired_logs(log_dir: impl AsRef<Path>, retention_days: u32) -> Result<usize> {
    let log_dir = log_dir.as_ref();
    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
    let mut deleted = 0;

    let mut entries = tokio::fs::read_dir(log_dir)
        .await
        .context("failed to read log directory")?;

    while let Some(entry) = entries.next_entry().await.context("failed to read directory entry")? {
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let modified: DateTime<Utc> = entry
            .metadata()
            .await
            .and_then(|m| m.modified())
            .context("failed to get file modification time")?
            .into();

        if modified < cutoff {
            tokio::fs::remove_file(&path)
                .await
                .with_context(|| format!("failed to delete {}", path.display()))?;
            debug!(path = %path.display(), "deleted expired log file");
            deleted += 1;
        }
    }

    if deleted > 0 {
        info!(count = deleted, retention_days, "cleaned up expired log files");
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_only_expired_log_files_are_removed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("medscribe.log.2024-01-01"), b"old").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        // Nothing is older than 30 days yet.
        assert_eq!(cleanup_expired_logs(dir.path(), 30).await.unwrap(), 0);

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        // Zero-day retention expires everything written before now.
        assert_eq!(cleanup_expired_logs(dir.path(), 0).await.unwrap(), 1);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_expired_logs(dir.path().join("nope"), 1).await.unwrap(), 0);
    }
}
