// src/store/sqlite.rs
// Embedded fallback backend. Also provides the pool opener the local state
// database (change tracking, sessions) shares.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::error::PipelineError;
use crate::parser::EventRecord;
use crate::store::{convert_timestamp, EventStore, InsertOutcome};

/// Open (creating if missing) a SQLite database with a single connection.
/// The pipeline is the only writer, and one connection keeps `:memory:`
/// databases coherent in tests.
pub async fn open_sqlite(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    table: String,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, table_name: &str) -> Self {
        Self {
            pool,
            table: table_name.to_string(),
        }
    }

    pub async fn connect(path: &Path, table_name: &str) -> Result<Self, PipelineError> {
        let pool = open_sqlite(path).await?;
        Ok(Self::new(pool, table_name))
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn ensure_schema(&self) -> Result<(), PipelineError> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                data TEXT NOT NULL,
                formato_processo TEXT NOT NULL,
                nome_arquivo TEXT NOT NULL,
                UNIQUE (data, formato_processo, nome_arquivo)
            )",
            self.table
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_records(
        &self,
        records: &[EventRecord],
    ) -> Result<InsertOutcome, PipelineError> {
        let mut outcome = InsertOutcome::default();
        let insert = format!(
            "INSERT OR IGNORE INTO {} (data, formato_processo, nome_arquivo)
             VALUES (?, ?, ?)",
            self.table
        );

        for record in records {
            let ts = match convert_timestamp(&record.timestamp) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(file = %record.file_name, %e, "skipping row");
                    outcome.conversion_errors.push(e.to_string());
                    continue;
                }
            };
            let result = sqlx::query(&insert)
                .bind(ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .bind(&record.process_format)
                .bind(&record.file_name)
                .execute(&self.pool)
                .await?;
            outcome.inserted += result.rows_affected();
        }
        Ok(outcome)
    }

    async fn count_records(&self) -> Result<i64, PipelineError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", self.table))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    async fn remove_duplicates(&self) -> Result<u64, PipelineError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {t}
             WHERE id NOT IN (
                 SELECT MIN(id) FROM {t}
                 GROUP BY data, formato_processo, nome_arquivo
             )",
            t = self.table
        ))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
