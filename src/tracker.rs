// src/tracker.rs
// Change-aware file selection. Remembers size + mtime per source log in the
// local state database and asks for reprocessing only when either drifts.
// Cheaper than hashing content; the known false-negative (content change
// with identical size and mtime) is accepted.

use std::path::Path;
use std::time::UNIX_EPOCH;

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::PipelineError;

/// Stored mtimes survive a filesystem/REAL-column round trip with sub-second
/// jitter; comparisons use this tolerance.
const MTIME_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct ChangeTracker {
    pool: SqlitePool,
}

impl ChangeTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), PipelineError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS processed_logs (
                log_path TEXT PRIMARY KEY,
                process_date TEXT,
                file_size INTEGER,
                file_mtime REAL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Whether `path` must be (re)processed: true when it was never recorded
    /// or when its current size or mtime differs from the recorded state.
    pub async fn needs_processing(&self, path: &Path) -> Result<bool, PipelineError> {
        let (size, mtime) = stat(path)?;

        let row = sqlx::query(
            "SELECT file_size, file_mtime FROM processed_logs WHERE log_path = ?",
        )
        .bind(path.to_string_lossy().as_ref())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(true);
        };

        let stored_size: i64 = row.try_get("file_size")?;
        let stored_mtime: f64 = row.try_get("file_mtime")?;

        let changed =
            stored_size != size as i64 || (stored_mtime - mtime).abs() > MTIME_EPSILON;
        if changed {
            debug!(
                path = %path.display(),
                stored_size,
                current_size = size,
                "source log changed since last run"
            );
        }
        Ok(changed)
    }

    /// Record a successful processing attempt. Last write wins.
    pub async fn record_processed(&self, path: &Path) -> Result<(), PipelineError> {
        let (size, mtime) = stat(path)?;

        sqlx::query(
            "INSERT OR REPLACE INTO processed_logs
                (log_path, process_date, file_size, file_mtime)
             VALUES (?, ?, ?, ?)",
        )
        .bind(path.to_string_lossy().as_ref())
        .bind(Utc::now().naive_utc())
        .bind(size as i64)
        .bind(mtime)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drop all processing state so the next run reprocesses every file.
    pub async fn reset(&self) -> Result<u64, PipelineError> {
        let result = sqlx::query("DELETE FROM processed_logs")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn tracked_count(&self) -> Result<i64, PipelineError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM processed_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }
}

fn stat(path: &Path) -> Result<(u64, f64), PipelineError> {
    let meta = std::fs::metadata(path).map_err(|source| PipelineError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mtime = meta
        .modified()
        .map_err(|source| PipelineError::FileRead {
            path: path.to_path_buf(),
            source,
        })?
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    Ok((meta.len(), mtime))
}
