//! EDI Log Pipeline — Binary Entrypoint
//! Runs the batch pipeline and the maintenance commands around it (status,
//! statistics, duplicate sweep, reprocess/reset).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use edi_log_pipeline::config::{PipelineConfig, ENV_CONFIG_PATH};
use edi_log_pipeline::session::SessionLog;
use edi_log_pipeline::source::LocalDirSource;
use edi_log_pipeline::store::{self, sqlite::open_sqlite};
use edi_log_pipeline::tracker::ChangeTracker;
use edi_log_pipeline::{Pipeline, PipelineError};

#[derive(Parser)]
#[command(name = "edi-log-pipeline", version, about)]
struct Cli {
    /// Path to the pipeline TOML config (defaults to config/pipeline.toml).
    #[arg(long, env = ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one full pipeline run (the default).
    Run,
    /// Show processing state and the last recorded session.
    Status,
    /// Show aggregated statistics over recent sessions.
    Stats {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Run only the duplicate sweep over the destination table.
    CleanDuplicates,
    /// Clear change-tracking state so the next run reprocesses every file.
    ForceReprocess,
    /// Clear change-tracking state and the session log.
    Reset,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("edi_log_pipeline=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op where the environment is already set.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::load()?,
    };

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_pipeline(config).await,
        Command::Status => show_status(config).await,
        Command::Stats { days } => show_stats(config, days).await,
        Command::CleanDuplicates => clean_duplicates(config).await,
        Command::ForceReprocess => force_reprocess(config).await,
        Command::Reset => reset(config).await,
    }
}

async fn state_pool(config: &PipelineConfig) -> Result<SqlitePool> {
    open_sqlite(&config.state_db)
        .await
        .with_context(|| format!("opening state database {}", config.state_db.display()))
}

async fn connect_store(
    config: &PipelineConfig,
) -> Result<Box<dyn edi_log_pipeline::EventStore>, PipelineError> {
    let url = config.primary_database_url();
    store::connect(url.as_deref(), &config.state_db, &config.table_name).await
}

async fn run_pipeline(config: PipelineConfig) -> Result<()> {
    let pool = state_pool(&config).await?;
    let tracker = ChangeTracker::new(pool.clone());
    let sessions = SessionLog::new(pool);
    let store = connect_store(&config).await?;
    let source = Box::new(LocalDirSource::new(config.log_dir.clone()));

    let pipeline = Pipeline::new(config, source, store, tracker, sessions);
    let summary = pipeline.run().await?;

    println!("Run finished ({} backend)", summary.backend);
    println!("  files discovered: {}", summary.files_discovered);
    println!("  files processed:  {}", summary.files_processed);
    println!("  files skipped:    {}", summary.files_skipped);
    println!("  records parsed:   {}", summary.records_generated);
    println!("  records filtered: {}", summary.records_filtered);
    println!("  rows inserted:    {}", summary.rows_inserted);
    println!("  duplicates swept: {}", summary.duplicates_removed);
    println!("  errors:           {}", summary.errors.len());
    for e in &summary.errors {
        println!("    - {e}");
    }
    if !summary.errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

async fn show_status(config: PipelineConfig) -> Result<()> {
    let pool = state_pool(&config).await?;
    let tracker = ChangeTracker::new(pool.clone());
    tracker.ensure_schema().await?;
    let sessions = SessionLog::new(pool);
    sessions.ensure_schema().await?;

    println!("Tracked source logs: {}", tracker.tracked_count().await?);

    match sessions.last_session().await? {
        Some(last) => {
            println!("Last session (#{}):", last.session_id);
            println!("  start:    {}", last.start_time);
            match last.end_time {
                Some(end) => println!("  end:      {end}"),
                None => println!("  end:      (not recorded)"),
            }
            println!("  files:    {}", last.log_files_processed);
            println!("  records:  {}", last.records_generated);
            println!("  inserted: {}", last.sql_records_inserted);
            println!("  errors:   {}", last.errors_count);
        }
        None => println!("No sessions recorded yet."),
    }

    match connect_store(&config).await {
        Ok(store) => {
            store.ensure_schema().await?;
            println!(
                "Destination ({}): {} rows",
                store.backend_name(),
                store.count_records().await?
            );
        }
        Err(e) => println!("Destination store unreachable: {e}"),
    }
    Ok(())
}

async fn show_stats(config: PipelineConfig, days: i64) -> Result<()> {
    let pool = state_pool(&config).await?;
    let sessions = SessionLog::new(pool);
    sessions.ensure_schema().await?;
    let stats = sessions.statistics(days).await?;

    println!("Statistics over the last {} days:", stats.window_days);
    println!("  sessions:        {}", stats.total_sessions);
    println!("  files processed: {}", stats.total_files);
    println!("  records parsed:  {}", stats.total_records);
    println!("  rows inserted:   {}", stats.total_inserted);
    println!("  errors:          {}", stats.total_errors);
    println!("  avg duration:    {:.2} min", stats.avg_duration_min);
    Ok(())
}

async fn clean_duplicates(config: PipelineConfig) -> Result<()> {
    let store = connect_store(&config).await?;
    store.ensure_schema().await?;
    let removed = store.remove_duplicates().await?;
    println!(
        "Removed {removed} duplicate rows from {} ({} backend)",
        config.table_name,
        store.backend_name()
    );
    Ok(())
}

async fn force_reprocess(config: PipelineConfig) -> Result<()> {
    let pool = state_pool(&config).await?;
    let tracker = ChangeTracker::new(pool);
    tracker.ensure_schema().await?;
    let cleared = tracker.reset().await?;
    println!("Cleared {cleared} processing-state entries; next run reprocesses everything.");
    Ok(())
}

async fn reset(config: PipelineConfig) -> Result<()> {
    let pool = state_pool(&config).await?;
    let tracker = ChangeTracker::new(pool.clone());
    tracker.ensure_schema().await?;
    let sessions = SessionLog::new(pool);
    sessions.ensure_schema().await?;

    let state_cleared = tracker.reset().await?;
    let sessions_cleared = sessions.clear().await?;
    println!("Cleared {state_cleared} processing-state entries and {sessions_cleared} sessions.");
    Ok(())
}
