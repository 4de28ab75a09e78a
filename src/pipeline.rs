// src/pipeline.rs
// Run coordinator. Drives one batch run through its stages, aggregates
// per-component counters and errors into a session record, and guarantees
// the file source is released on every exit path.
//
// File-scoped failures are accumulated and the run continues; only an
// unavailable store or an empty file source aborts the whole run.

use chrono::{NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::export;
use crate::filter::KeywordFilter;
use crate::parser::{self, EventRecord};
use crate::session::SessionLog;
use crate::source::{FilePattern, FileSource};
use crate::store::EventStore;
use crate::tracker::ChangeTracker;

/// Stages of one run, in order. Terminal success is `SessionRecorded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Initializing,
    Discovering,
    ParsingAndFiltering,
    Persisting,
    Deduplicating,
    SessionRecorded,
}

/// Counters and errors for one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub backend: &'static str,
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_skipped: usize,
    pub records_generated: usize,
    pub records_filtered: usize,
    pub rows_inserted: u64,
    pub duplicates_removed: u64,
    pub errors: Vec<String>,
}

pub struct Pipeline {
    config: PipelineConfig,
    source: Box<dyn FileSource>,
    store: Box<dyn EventStore>,
    tracker: ChangeTracker,
    sessions: SessionLog,
    filter: KeywordFilter,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        source: Box<dyn FileSource>,
        store: Box<dyn EventStore>,
        tracker: ChangeTracker,
        sessions: SessionLog,
    ) -> Self {
        let filter = KeywordFilter::new(&config.keywords);
        Self {
            config,
            source,
            store,
            tracker,
            sessions,
            filter,
        }
    }

    /// Execute one full run. The source connection is closed whether the run
    /// succeeds or aborts.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let result = self.run_inner().await;
        self.source.close().await;
        result
    }

    async fn run_inner(&self) -> Result<RunSummary, PipelineError> {
        let started_at = Utc::now().naive_utc();
        let mut errors: Vec<String> = Vec::new();

        info!(stage = ?RunStage::Initializing, source = self.source.name(), "run starting");
        self.tracker.ensure_schema().await?;
        self.sessions.ensure_schema().await?;

        // Discovery happens before the destination store is touched, so an
        // empty source aborts without any store contact.
        info!(stage = ?RunStage::Discovering, "listing source files");
        let pattern = FilePattern::new(&self.config.file_prefix, &self.config.file_suffix);
        let files = self
            .source
            .fetch_all(&pattern, &self.config.log_dir)
            .await?;
        if files.is_empty() {
            return Err(PipelineError::NoSourceFiles);
        }
        let files_discovered = files.len();
        info!(files = files_discovered, "source files retrieved");

        self.store.ensure_schema().await?;

        info!(stage = ?RunStage::ParsingAndFiltering, "parsing source logs");
        let mut files_processed = 0usize;
        let mut files_skipped = 0usize;
        let mut records_generated = 0usize;
        let mut records_filtered = 0usize;
        // One batch per source file, persisted in discovery order.
        let mut batches: Vec<(std::path::PathBuf, Vec<EventRecord>)> = Vec::new();

        for path in files {
            match self.tracker.needs_processing(&path).await {
                Ok(false) => {
                    files_skipped += 1;
                    continue;
                }
                Ok(true) => {}
                Err(e) => {
                    warn!(path = %path.display(), %e, "change check failed");
                    errors.push(e.to_string());
                    continue;
                }
            }

            let records = match parser::parse_file(&path) {
                Ok(records) => records,
                Err(e) => {
                    warn!(path = %path.display(), %e, "skipping unreadable log");
                    errors.push(e.to_string());
                    continue;
                }
            };
            records_generated += records.len();

            let raw_csv = export::artifact_path(&self.config.output_dir, &path, false);
            if let Err(e) = export::write_records_csv(&raw_csv, &records) {
                errors.push(format!("{e:#}"));
            }

            let filtered = self.filter.filter(records);
            records_filtered += filtered.len();

            let filtered_csv = export::artifact_path(&self.config.output_dir, &path, true);
            if let Err(e) = export::write_records_csv(&filtered_csv, &filtered) {
                errors.push(format!("{e:#}"));
            }

            files_processed += 1;
            batches.push((path, filtered));
        }

        info!(
            stage = ?RunStage::Persisting,
            backend = self.store.backend_name(),
            batches = batches.len(),
            "persisting filtered records"
        );
        let mut rows_inserted = 0u64;
        for (path, records) in &batches {
            match self.store.insert_records(records).await {
                Ok(outcome) => {
                    rows_inserted += outcome.inserted;
                    errors.extend(outcome.conversion_errors);
                    // Mark processed only after the batch landed, so a failed
                    // file is retried by change detection on the next run.
                    if let Err(e) = self.tracker.record_processed(path).await {
                        errors.push(e.to_string());
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), %e, "batch failed");
                    errors.push(format!("persist {}: {e}", path.display()));
                }
            }
        }

        info!(stage = ?RunStage::Deduplicating, "running duplicate sweep");
        let duplicates_removed = match self.store.remove_duplicates().await {
            Ok(n) => n,
            Err(e) => {
                errors.push(e.to_string());
                0
            }
        };

        match export::cleanup_old_artifacts(&self.config.output_dir, self.config.keep_csv_days) {
            Ok(0) => {}
            Ok(removed) => info!(removed, "old CSV artifacts removed"),
            Err(e) => warn!(%e, "artifact cleanup failed"),
        }

        let summary = RunSummary {
            started_at,
            finished_at: Utc::now().naive_utc(),
            backend: self.store.backend_name(),
            files_discovered,
            files_processed,
            files_skipped,
            records_generated,
            records_filtered,
            rows_inserted,
            duplicates_removed,
            errors,
        };

        if let Err(e) = self.sessions.record(&summary).await {
            warn!(%e, "could not record session");
        }
        info!(
            stage = ?RunStage::SessionRecorded,
            files = summary.files_processed,
            skipped = summary.files_skipped,
            inserted = summary.rows_inserted,
            duplicates_removed = summary.duplicates_removed,
            errors = summary.errors.len(),
            "run finished"
        );
        Ok(summary)
    }
}
