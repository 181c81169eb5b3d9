use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::backend::{DestinationBackend, SaveOutcome, TestOutcome};
use crate::config::{LocalConfig, NetworkShareConfig};
use crate::error::DestinationError;

const TEST_FILE_NAME: &str = "reef-connectivity-test.tmp";
const TEST_CONTENT: &[u8] = b"reef connectivity test";

fn write_under(base_path: &str, relative: &str, bytes: &[u8]) -> Result<String, DestinationError> {
    let final_path = Path::new(base_path).join(relative);
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&final_path, bytes)?;
    Ok(final_path.display().to_string())
}

/// Local filesystem destination. Supports `compensate`.
#[derive(Debug, Default)]
pub struct LocalBackend;

impl DestinationBackend for LocalBackend {
    fn save(
        &self,
        source_file_path: &Path,
        relative_path: &str,
        config: &Value,
    ) -> Result<SaveOutcome, DestinationError> {
        let config: LocalConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let final_path = Path::new(&config.base_path).join(relative_path);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source_file_path, &final_path)?;
        Ok(SaveOutcome::ok(final_path.display().to_string()))
    }

    fn test(
        &self,
        config: &Value,
        test_name: Option<&str>,
        test_content: Option<&[u8]>,
    ) -> Result<TestOutcome, DestinationError> {
        let config: LocalConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let content = test_content.unwrap_or(TEST_CONTENT);
        let path = write_under(&config.base_path, test_name.unwrap_or(TEST_FILE_NAME), content)?;
        fs::remove_file(&path).ok();
        Ok(TestOutcome {
            success: true,
            final_path: Some(path),
            bytes: Some(content.len() as u64),
            response_ms: Some(0),
            message: None,
        })
    }

    fn compensate(&self, path: &str, _config: &Value) -> Result<(), DestinationError> {
        fs::remove_file(path)?;
        Ok(())
    }
}

/// Network share destination. Mechanically identical to [`LocalBackend`] —
/// the share is expected to already be mounted at `base_path` by the host —
/// but does not support `compensate` (§4.C6).
#[derive(Debug, Default)]
pub struct NetworkShareBackend;

impl DestinationBackend for NetworkShareBackend {
    fn save(
        &self,
        source_file_path: &Path,
        relative_path: &str,
        config: &Value,
    ) -> Result<SaveOutcome, DestinationError> {
        let config: NetworkShareConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let final_path = Path::new(&config.base_path).join(relative_path);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source_file_path, &final_path)?;
        Ok(SaveOutcome::ok(final_path.display().to_string()))
    }

    fn test(
        &self,
        config: &Value,
        test_name: Option<&str>,
        test_content: Option<&[u8]>,
    ) -> Result<TestOutcome, DestinationError> {
        let config: NetworkShareConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let content = test_content.unwrap_or(TEST_CONTENT);
        let path = write_under(&config.base_path, test_name.unwrap_or(TEST_FILE_NAME), content)?;
        fs::remove_file(&path).ok();
        Ok(TestOutcome {
            success: true,
            final_path: Some(path),
            bytes: Some(content.len() as u64),
            response_ms: Some(0),
            message: None,
        })
    }
}
