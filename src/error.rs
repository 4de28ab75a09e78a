// src/error.rs
// Error taxonomy for the pipeline. File- and row-scoped failures are
// accumulated into the run summary; the fatal variants abort the run.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A source log could not be read. File-scoped: logged, skipped, the run
    /// continues with the next file.
    #[error("cannot read source log {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record timestamp could not be converted at insert time. Row-scoped:
    /// the row is skipped, the rest of the batch proceeds.
    #[error("cannot convert timestamp {value:?} (expected DD/MM/YYYY HH:MM:SS)")]
    Conversion { value: String },

    /// The primary destination store was configured but could not be opened.
    /// Pipeline-fatal; never downgraded to the local fallback mid-run.
    #[error("destination store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),

    /// The file source yielded nothing. Pipeline-fatal, raised before the
    /// destination store is touched.
    #[error("file source returned no matching log files")]
    NoSourceFiles,

    /// The file source itself failed (listing or retrieval). Pipeline-fatal.
    #[error("file source failure: {0:#}")]
    Source(anyhow::Error),

    /// State or destination database failure outside the variants above.
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<anyhow::Error> for PipelineError {
    fn from(e: anyhow::Error) -> Self {
        PipelineError::Source(e)
    }
}

impl PipelineError {
    /// True for errors that abort the whole run rather than one file or row.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::StoreUnavailable(_)
                | PipelineError::NoSourceFiles
                | PipelineError::Source(_)
        )
    }
}
