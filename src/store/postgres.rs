// src/store/postgres.rs
// Primary networked backend.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::warn;

use crate::error::PipelineError;
use crate::parser::EventRecord;
use crate::store::{convert_timestamp, EventStore, InsertOutcome};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    table: String,
}

impl PostgresStore {
    pub fn new(pool: PgPool, table_name: &str) -> Self {
        Self {
            pool,
            table: table_name.to_string(),
        }
    }

    pub async fn connect(database_url: &str, table_name: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool, table_name))
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn ensure_schema(&self) -> Result<(), PipelineError> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                data TIMESTAMP NOT NULL,
                formato_processo TEXT NOT NULL,
                nome_arquivo TEXT NOT NULL
            )",
            self.table
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_unique_log
             ON {} (data, formato_processo, nome_arquivo)",
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
            "INSERT INTO {} (data, formato_processo, nome_arquivo)
             VALUES ($1, $2, $3)
             ON CONFLICT (data, formato_processo, nome_arquivo) DO NOTHING",
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
                .bind(ts)
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
        // Keep the lowest id per logical record, delete the rest.
        let result = sqlx::query(&format!(
            "DELETE FROM {t}
             WHERE id IN (
                 SELECT id FROM (
                     SELECT id,
                            ROW_NUMBER() OVER (
                                PARTITION BY data, formato_processo, nome_arquivo
                                ORDER BY id
                            ) AS rn
                     FROM {t}
                 ) ranked
                 WHERE ranked.rn > 1
             )",
            t = self.table
        ))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
