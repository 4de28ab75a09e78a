// src/session.rs
// Append-only session log in the local state database. One row per pipeline
// run; the reporting side reads it, the core only inserts.

use chrono::{Duration, NaiveDateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::error::PipelineError;
use crate::pipeline::RunSummary;

#[derive(Debug, Clone)]
pub struct SessionLog {
    pool: SqlitePool,
}

/// One recorded run, as read back for status output.
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub session_id: i64,
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub log_files_processed: i64,
    pub records_generated: i64,
    pub sql_records_inserted: i64,
    pub errors_count: i64,
}

/// Aggregates over a trailing window of sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub window_days: i64,
    pub total_sessions: i64,
    pub total_files: i64,
    pub total_records: i64,
    pub total_inserted: i64,
    pub total_errors: i64,
    pub avg_duration_min: f64,
}

impl SessionLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), PipelineError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS processing_sessions (
                session_id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_time TEXT,
                end_time TEXT,
                log_files_processed INTEGER DEFAULT 0,
                records_generated INTEGER DEFAULT 0,
                sql_records_inserted INTEGER DEFAULT 0,
                errors_count INTEGER DEFAULT 0
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record(&self, summary: &RunSummary) -> Result<(), PipelineError> {
        sqlx::query(
            "INSERT INTO processing_sessions
                (start_time, end_time, log_files_processed, records_generated,
                 sql_records_inserted, errors_count)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(summary.started_at)
        .bind(summary.finished_at)
        .bind(summary.files_processed as i64)
        .bind(summary.records_generated as i64)
        .bind(summary.rows_inserted as i64)
        .bind(summary.errors.len() as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn last_session(&self) -> Result<Option<SessionRow>, PipelineError> {
        let row = sqlx::query(
            "SELECT session_id, start_time, end_time, log_files_processed,
                    records_generated, sql_records_inserted, errors_count
             FROM processing_sessions
             ORDER BY session_id DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| read_session_row(&r)).transpose()
    }

    /// Totals and average duration over the last `days` days of sessions.
    pub async fn statistics(&self, days: i64) -> Result<SessionStats, PipelineError> {
        let since = Utc::now().naive_utc() - Duration::days(days);
        let rows = sqlx::query(
            "SELECT session_id, start_time, end_time, log_files_processed,
                    records_generated, sql_records_inserted, errors_count
             FROM processing_sessions
             WHERE start_time >= ?
             ORDER BY session_id",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        let mut stats = SessionStats {
            window_days: days,
            ..SessionStats::default()
        };
        let mut duration_sum_min = 0.0f64;
        let mut duration_count = 0i64;

        for r in &rows {
            let session = read_session_row(r)?;
            stats.total_sessions += 1;
            stats.total_files += session.log_files_processed;
            stats.total_records += session.records_generated;
            stats.total_inserted += session.sql_records_inserted;
            stats.total_errors += session.errors_count;
            if let Some(end) = session.end_time {
                duration_sum_min +=
                    (end - session.start_time).num_seconds() as f64 / 60.0;
                duration_count += 1;
            }
        }
        if duration_count > 0 {
            stats.avg_duration_min = duration_sum_min / duration_count as f64;
        }
        Ok(stats)
    }

    /// Explicit reset support; never called by the pipeline itself.
    pub async fn clear(&self) -> Result<u64, PipelineError> {
        let result = sqlx::query("DELETE FROM processing_sessions")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn read_session_row(r: &sqlx::sqlite::SqliteRow) -> Result<SessionRow, PipelineError> {
    Ok(SessionRow {
        session_id: r.try_get("session_id")?,
        start_time: r.try_get("start_time")?,
        end_time: r.try_get("end_time")?,
        log_files_processed: r.try_get("log_files_processed")?,
        records_generated: r.try_get("records_generated")?,
        sql_records_inserted: r.try_get("sql_records_inserted")?,
        errors_count: r.try_get("errors_count")?,
    })
}
