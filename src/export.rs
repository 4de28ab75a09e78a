// src/export.rs
// CSV artifacts mirroring each source log: one file with every parsed record
// and one with the filtered subset, plus age-based cleanup of old artifacts.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::parser::EventRecord;

pub const CSV_HEADER: &str = "Date,EDI Process Format,File Name";

/// Artifact path for a source log: same stem, `.csv` (or `_filtrado.csv` for
/// the filtered variant), under the output directory.
pub fn artifact_path(output_dir: &Path, log_path: &Path, filtered: bool) -> PathBuf {
    let stem = log_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    let name = if filtered {
        format!("{stem}_filtrado.csv")
    } else {
        format!("{stem}.csv")
    };
    output_dir.join(name)
}

/// Write records as UTF-8 CSV with the fixed header, one row per record.
pub fn write_records_csv(path: &Path, records: &[EventRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    let mut out = std::fs::File::create(path)
        .with_context(|| format!("creating CSV artifact {}", path.display()))?;
    writeln!(out, "{CSV_HEADER}")?;
    for r in records {
        writeln!(
            out,
            "{},{},{}",
            escape(&r.timestamp),
            escape(&r.process_format),
            escape(&r.file_name)
        )?;
    }
    debug!(path = %path.display(), rows = records.len(), "CSV artifact written");
    Ok(())
}

/// Remove artifacts older than `keep_days`. Best-effort: individual failures
/// are logged and do not stop the sweep.
pub fn cleanup_old_artifacts(output_dir: &Path, keep_days: u64) -> Result<usize> {
    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(keep_days * 24 * 3600))
        .unwrap_or(SystemTime::UNIX_EPOCH);
    let mut removed = 0usize;

    let entries = match std::fs::read_dir(output_dir) {
        Ok(entries) => entries,
        // Nothing generated yet.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("listing output directory {}", output_dir.display()))
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("csv") {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if modified < cutoff {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), %e, "could not remove old artifact"),
            }
        }
    }
    Ok(removed)
}

// Minimal CSV quoting: only fields containing comma, quote, or newline get
// wrapped, with embedded quotes doubled.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(file_name: &str) -> EventRecord {
        EventRecord {
            timestamp: "01/01/2024 10:00:00".to_string(),
            process_format: "Upload de FTP".to_string(),
            file_name: file_name.to_string(),
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        write_records_csv(&path, &[record("A.txt"), record("B,with,commas.txt")]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(lines.next(), Some("01/01/2024 10:00:00,Upload de FTP,A.txt"));
        assert_eq!(
            lines.next(),
            Some("01/01/2024 10:00:00,Upload de FTP,\"B,with,commas.txt\"")
        );
    }

    #[test]
    fn artifact_paths_mirror_the_log_name() {
        let out = Path::new("processed_csvs");
        let log = Path::new("downloads/ConsoleEDI_20240101.Log");
        assert_eq!(
            artifact_path(out, log, false),
            Path::new("processed_csvs/ConsoleEDI_20240101.csv")
        );
        assert_eq!(
            artifact_path(out, log, true),
            Path::new("processed_csvs/ConsoleEDI_20240101_filtrado.csv")
        );
    }

    #[test]
    fn cleanup_of_missing_dir_is_a_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("never_created");
        assert_eq!(cleanup_old_artifacts(&missing, 7).unwrap(), 0);
    }
}
