// src/store/mod.rs
// Relational sink with two interchangeable backends behind one trait: the
// networked primary store and the embedded local fallback. Selection happens
// once at startup; the coordinator never switches mid-run.

pub mod postgres;
pub mod sqlite;

use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::parser::EventRecord;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Source timestamp layout (`DD/MM/YYYY HH:MM:SS`).
pub const SOURCE_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Outcome of one insert batch. Conversion failures are row-scoped: counted
/// and reported, never fatal for the batch.
#[derive(Debug, Default)]
pub struct InsertOutcome {
    pub inserted: u64,
    pub conversion_errors: Vec<String>,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Create the destination table and its uniqueness constraint over
    /// (timestamp, process format, file name) if absent.
    async fn ensure_schema(&self) -> Result<(), PipelineError>;

    /// Insert records with insert-if-absent semantics. Repeated runs over
    /// unchanged input are idempotent independent of change tracking.
    async fn insert_records(&self, records: &[EventRecord])
        -> Result<InsertOutcome, PipelineError>;

    async fn count_records(&self) -> Result<i64, PipelineError>;

    /// Maintenance pass over the whole table: within each
    /// (timestamp, process format, file name) group keep the lowest id,
    /// delete the rest. Idempotent.
    async fn remove_duplicates(&self) -> Result<u64, PipelineError>;

    fn backend_name(&self) -> &'static str;
}

/// Pick the backend once, before the run starts.
///
/// A configured primary URL means the primary must be reachable: a connect
/// failure is pipeline-fatal, never a silent fallback. Only the absence of
/// primary configuration selects the embedded local store.
pub async fn connect(
    primary_url: Option<&str>,
    fallback_db: &Path,
    table_name: &str,
) -> Result<Box<dyn EventStore>, PipelineError> {
    match primary_url {
        Some(url) => {
            let store = PostgresStore::connect(url, table_name)
                .await
                .map_err(PipelineError::StoreUnavailable)?;
            info!(backend = store.backend_name(), "destination store ready");
            Ok(Box::new(store))
        }
        None => {
            warn!(
                db = %fallback_db.display(),
                "no primary database configured; using embedded local store"
            );
            let store = SqliteStore::connect(fallback_db, table_name).await?;
            Ok(Box::new(store))
        }
    }
}

/// Convert a source timestamp for storage. Malformed values become the
/// row-scoped `Conversion` error the caller logs and skips.
pub fn convert_timestamp(raw: &str) -> Result<NaiveDateTime, PipelineError> {
    NaiveDateTime::parse_from_str(raw, SOURCE_TIMESTAMP_FORMAT).map_err(|_| {
        PipelineError::Conversion {
            value: raw.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_source_layout() {
        let ts = convert_timestamp("31/12/2024 23:59:58").unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-12-31 23:59:58");
    }

    #[test]
    fn rejects_iso_layout() {
        assert!(matches!(
            convert_timestamp("2024-12-31 23:59:58"),
            Err(PipelineError::Conversion { .. })
        ));
    }
}
