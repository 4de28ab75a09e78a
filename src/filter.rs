// src/filter.rs
// Keyword filter over parsed records. A record survives when its
// process-format label contains any configured keyword, case-insensitively.
// Order-preserving; duplicate elimination is the sink's concern.

use crate::parser::EventRecord;

#[derive(Debug, Clone)]
pub struct KeywordFilter {
    // Lowercased once at construction.
    keywords: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn matches(&self, process_format: &str) -> bool {
        let haystack = process_format.to_lowercase();
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }

    pub fn filter(&self, records: Vec<EventRecord>) -> Vec<EventRecord> {
        records
            .into_iter()
            .filter(|r| self.matches(&r.process_format))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(process_format: &str) -> EventRecord {
        EventRecord {
            timestamp: "01/01/2024 10:00:00".to_string(),
            process_format: process_format.to_string(),
            file_name: "A.txt".to_string(),
        }
    }

    fn default_filter() -> KeywordFilter {
        KeywordFilter::new(["Upload de FTP", "Envio de e-mail por SMTP"])
    }

    #[test]
    fn retains_matches_case_insensitively() {
        let f = default_filter();
        let out = f.filter(vec![
            record("Upload de FTP"),
            record("Consulta de Status"),
            record("ENVIO DE E-MAIL POR SMTP"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].process_format, "Upload de FTP");
        assert_eq!(out[1].process_format, "ENVIO DE E-MAIL POR SMTP");
    }

    #[test]
    fn keyword_matches_as_substring() {
        let f = default_filter();
        assert!(f.matches("EDI - Upload de FTP (lote 3)"));
        assert!(!f.matches("Download de FTP"));
    }

    #[test]
    fn preserves_order_and_duplicates() {
        let f = default_filter();
        let out = f.filter(vec![
            record("Upload de FTP"),
            record("Upload de FTP"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn empty_keyword_set_drops_everything() {
        let f = KeywordFilter::new(Vec::<String>::new());
        assert!(f.filter(vec![record("Upload de FTP")]).is_empty());
    }
}
