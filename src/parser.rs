// src/parser.rs
// Block-structured parser for gateway log files. A document is a
// concatenation of blocks separated by a fixed dashed line; each block logs
// one EDI exchange with a timestamp, a process-format label, and one line
// per file that took part in it.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PipelineError;

/// Separator the gateway writes between blocks: 70 dashes on their own line.
pub const SEPARATOR_LINE: &str =
    "----------------------------------------------------------------------";

static RE_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Data:\s+(\d{2}/\d{2}/\d{4} \d{2}:\d{2}:\d{2})").unwrap());
static RE_PROCESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Formato do Processo de EDI:\s+(.+)").unwrap());
static RE_FILE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"Nome do Arquivo:\s+(.+)").unwrap());

/// One parsed business event. The timestamp stays in its source form
/// (`DD/MM/YYYY HH:MM:SS`); conversion happens at the sink so a malformed
/// value is a row-scoped error there, not a parse failure here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub timestamp: String,
    pub process_format: String,
    pub file_name: String,
}

/// Parse a full log document into event records.
///
/// Within each block the first timestamp match and the first process-format
/// match are taken, together with every file-name line. A block yields one
/// record per file name, and only when all three kinds were present; partial
/// blocks are silently skipped.
pub fn parse_document(content: &str) -> Vec<EventRecord> {
    // The gateway runs on Windows; normalize CRLF so the separator line
    // matches regardless of how the file was transferred.
    let content = content.replace("\r\n", "\n");
    let separator = format!("{SEPARATOR_LINE}\n");
    let mut records = Vec::new();

    for block in content.split(separator.as_str()) {
        let timestamp = RE_TIMESTAMP
            .captures(block)
            .map(|c| c[1].trim_end().to_string());
        let process_format = RE_PROCESS
            .captures(block)
            .map(|c| c[1].trim_end().to_string());

        let (Some(timestamp), Some(process_format)) = (timestamp, process_format) else {
            continue;
        };

        for caps in RE_FILE_NAME.captures_iter(block) {
            records.push(EventRecord {
                timestamp: timestamp.clone(),
                process_format: process_format.clone(),
                file_name: caps[1].trim_end().to_string(),
            });
        }
    }

    records
}

/// Read and parse one source log. An unreadable file (missing, not valid
/// UTF-8) is a file-scoped error the coordinator records before moving on.
pub fn parse_file(path: &Path) -> Result<Vec<EventRecord>, PipelineError> {
    let content = std::fs::read_to_string(path).map_err(|source| PipelineError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_document(&content))
}
