// src/lib.rs
// Public library surface for integration tests (and potential reuse).
//
// Batch pipeline for EDI gateway logs: discover files, parse blocks into
// event records, filter by business keywords, persist idempotently into a
// relational store (networked primary or embedded fallback), sweep
// duplicates, and record a session summary.

pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod parser;
pub mod pipeline;
pub mod session;
pub mod source;
pub mod store;
pub mod tracker;

// ---- Re-exports for stable public API ----
pub use crate::config::PipelineConfig;
pub use crate::error::PipelineError;
pub use crate::filter::KeywordFilter;
pub use crate::parser::EventRecord;
pub use crate::pipeline::{Pipeline, RunStage, RunSummary};
pub use crate::session::SessionLog;
pub use crate::source::{FilePattern, FileSource, LocalDirSource};
pub use crate::store::{EventStore, InsertOutcome};
pub use crate::tracker::ChangeTracker;
