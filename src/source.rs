// src/source.rs
// Seam to the file-retrieval collaborator. The pipeline only needs a source
// that yields readable local files following the gateway naming convention;
// the FTP/SMB transport lives behind this trait.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Naming convention for gateway logs: `ConsoleEDI_*.Log`.
#[derive(Debug, Clone)]
pub struct FilePattern {
    pub prefix: String,
    pub suffix: String,
}

impl FilePattern {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.prefix) && file_name.ends_with(&self.suffix)
    }
}

#[async_trait]
pub trait FileSource: Send + Sync {
    /// Names of remote files matching the pattern, without retrieving them.
    async fn list_matching(&self, pattern: &FilePattern) -> Result<Vec<String>>;

    /// Retrieve all matching files into `destination_dir` and return the
    /// local paths. Paths must point to readable local files.
    async fn fetch_all(
        &self,
        pattern: &FilePattern,
        destination_dir: &Path,
    ) -> Result<Vec<PathBuf>>;

    /// Release the underlying connection. Called on every pipeline exit
    /// path, success or failure.
    async fn close(&self);

    fn name(&self) -> &'static str;
}

/// Source over an already-local directory (mounted share, or a drop folder a
/// separate transfer job fills). Scans the root only, as the gateway writes
/// flat.
#[derive(Debug, Clone)]
pub struct LocalDirSource {
    root: PathBuf,
}

impl LocalDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn scan(&self, pattern: &FilePattern) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("listing source directory {}", self.root.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if pattern.matches(name) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl FileSource for LocalDirSource {
    async fn list_matching(&self, pattern: &FilePattern) -> Result<Vec<String>> {
        Ok(self
            .scan(pattern)?
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect())
    }

    async fn fetch_all(
        &self,
        pattern: &FilePattern,
        _destination_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        // Files are already local; no copy step.
        self.scan(pattern)
    }

    async fn close(&self) {}

    fn name(&self) -> &'static str {
        "LocalDirSource"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_requires_prefix_and_suffix() {
        let p = FilePattern::new("ConsoleEDI_", ".Log");
        assert!(p.matches("ConsoleEDI_20240101.Log"));
        assert!(!p.matches("ConsoleEDI_20240101.Log.zip"));
        assert!(!p.matches("OtherGateway_20240101.Log"));
    }

    #[tokio::test]
    async fn local_source_scans_root_only() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("ConsoleEDI_a.Log"), "x").unwrap();
        std::fs::write(tmp.path().join("ignored.txt"), "x").unwrap();
        let nested = tmp.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("ConsoleEDI_b.Log"), "x").unwrap();

        let source = LocalDirSource::new(tmp.path());
        let pattern = FilePattern::new("ConsoleEDI_", ".Log");
        let names = source.list_matching(&pattern).await.unwrap();
        assert_eq!(names, vec!["ConsoleEDI_a.Log".to_string()]);
    }
}
