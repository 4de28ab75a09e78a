// src/config.rs
// Explicit pipeline configuration, injected into each component at
// construction. Loaded from TOML with env-var path override; every field
// falls back to the values the gateway deployment has always used.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

pub const ENV_CONFIG_PATH: &str = "EDI_PIPELINE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

/// Env var carrying the primary (networked) database URL. When unset, the
/// pipeline runs against the embedded local store instead.
pub const ENV_DATABASE_URL: &str = "EDI_DATABASE_URL";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory the file source delivers logs into, scanned non-recursively.
    pub log_dir: PathBuf,
    /// Directory for generated CSV artifacts.
    pub output_dir: PathBuf,
    /// Local SQLite database holding processing state and the session log.
    pub state_db: PathBuf,
    /// Destination table for persisted event rows (both backends).
    pub table_name: String,
    /// Source log naming convention: `ConsoleEDI_*.Log`.
    pub file_prefix: String,
    pub file_suffix: String,
    /// Keywords retained by the record filter (case-insensitive substrings).
    pub keywords: Vec<String>,
    /// CSV artifacts older than this many days are removed after each run.
    pub keep_csv_days: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("downloaded_logs"),
            output_dir: PathBuf::from("processed_csvs"),
            state_db: PathBuf::from("processed_files.db"),
            table_name: "edi_logs".to_string(),
            file_prefix: "ConsoleEDI_".to_string(),
            file_suffix: ".Log".to_string(),
            keywords: vec![
                "Upload de FTP".to_string(),
                "Envio de e-mail por SMTP".to_string(),
            ],
            keep_csv_days: 7,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        let cfg: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("parsing pipeline config {}", path.display()))?;
        Ok(cfg)
    }

    /// Load configuration using env var + fallbacks:
    /// 1) $EDI_PIPELINE_CONFIG
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    pub fn load() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::from_toml_file(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::from_toml_file(&default_p);
        }
        Ok(Self::default())
    }

    /// Primary database URL, if one is configured for this deployment.
    pub fn primary_database_url(&self) -> Option<String> {
        std::env::var(ENV_DATABASE_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn defaults_match_gateway_deployment() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.table_name, "edi_logs");
        assert_eq!(cfg.file_prefix, "ConsoleEDI_");
        assert_eq!(cfg.file_suffix, ".Log");
        assert_eq!(cfg.keywords.len(), 2);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let cfg: PipelineConfig =
            toml::from_str(r#"keywords = ["Upload de FTP"]"#).unwrap();
        assert_eq!(cfg.keywords, vec!["Upload de FTP".to_string()]);
        assert_eq!(cfg.table_name, "edi_logs");
    }

    #[serial_test::serial]
    #[test]
    fn load_uses_env_then_fallbacks() {
        let tmp = tempfile::tempdir().unwrap();

        env::remove_var(ENV_CONFIG_PATH);

        let p = tmp.path().join("pipeline.toml");
        fs::write(&p, r#"table_name = "edi_logs_test""#).unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        let cfg = PipelineConfig::load().unwrap();
        assert_eq!(cfg.table_name, "edi_logs_test");
        env::remove_var(ENV_CONFIG_PATH);
    }
}
