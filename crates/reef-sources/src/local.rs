use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::backend::SourceBackend;
use crate::config::LocalSourceConfig;
use crate::error::SourceError;
use crate::item::SourceListing;

fn modified_of(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

fn list_glob(base_path: &str, pattern: &str) -> Result<Vec<SourceListing>, SourceError> {
    let full_pattern = format!("{}/{}", base_path.trim_end_matches('/'), pattern);
    let mut listings = Vec::new();
    for entry in glob::glob(&full_pattern).map_err(|e| SourceError::Config(e.to_string()))? {
        let path = entry.map_err(|e| SourceError::Io(e.into_error()))?;
        if !path.is_file() {
            continue;
        }
        let identifier = path
            .strip_prefix(base_path)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        listings.push(SourceListing {
            identifier,
            modified: modified_of(&path),
        });
    }
    Ok(listings)
}

/// Local filesystem source. Also backs [`NetworkShareSourceBackend`] since
/// a mounted share behaves identically once mounted.
#[derive(Debug, Default)]
pub struct LocalSourceBackend;

impl SourceBackend for LocalSourceBackend {
    fn list(&self, config: &Value, pattern: &str) -> Result<Vec<SourceListing>, SourceError> {
        let config: LocalSourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        list_glob(&config.base_path, pattern)
    }

    fn fetch_one(&self, config: &Value, identifier: &str) -> Result<Vec<u8>, SourceError> {
        let config: LocalSourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        let path = Path::new(&config.base_path).join(identifier);
        Ok(fs::read(path)?)
    }

    fn archive(&self, config: &Value, identifier: &str) -> Result<(), SourceError> {
        let config: LocalSourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        let archive_path = config
            .archive_path
            .ok_or_else(|| SourceError::Config("archivePath not configured".into()))?;
        let source = Path::new(&config.base_path).join(identifier);
        let destination = Path::new(&archive_path).join(identifier);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&source, &destination)?;
        Ok(())
    }
}

/// Network share source. Identical to [`LocalSourceBackend`] — the share is
/// expected to already be mounted at `basePath` by the host.
#[derive(Debug, Default)]
pub struct NetworkShareSourceBackend(LocalSourceBackend);

impl SourceBackend for NetworkShareSourceBackend {
    fn list(&self, config: &Value, pattern: &str) -> Result<Vec<SourceListing>, SourceError> {
        self.0.list(config, pattern)
    }

    fn fetch_one(&self, config: &Value, identifier: &str) -> Result<Vec<u8>, SourceError> {
        self.0.fetch_one(config, identifier)
    }

    fn archive(&self, config: &Value, identifier: &str) -> Result<(), SourceError> {
        self.0.archive(config, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn list_matches_glob_pattern_and_excludes_directories() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join("a.csv"), b"1").unwrap();
        fs::write(td.path().join("b.txt"), b"2").unwrap();
        fs::create_dir(td.path().join("sub.csv")).unwrap();

        let config = serde_json::json!({ "basePath": td.path().to_string_lossy() });
        let listings = LocalSourceBackend.list(&config, "*.csv").expect("list");

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].identifier, "a.csv");
    }

    #[test]
    fn archive_moves_file_to_archive_path() {
        let td = tempdir().expect("tempdir");
        let archive = tempdir().expect("tempdir");
        fs::write(td.path().join("a.csv"), b"1").unwrap();

        let config = serde_json::json!({
            "basePath": td.path().to_string_lossy(),
            "archivePath": archive.path().to_string_lossy(),
        });
        LocalSourceBackend.archive(&config, "a.csv").expect("archive");

        assert!(!td.path().join("a.csv").exists());
        assert!(archive.path().join("a.csv").exists());
    }
}
