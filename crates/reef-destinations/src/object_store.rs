use std::path::Path;
use std::time::Instant;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::backend::{DestinationBackend, SaveOutcome, TestOutcome};
use crate::config::{AzureBlobConfig, S3Config};
use crate::error::DestinationError;

fn client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .expect("reqwest client builds with default tls backend")
}

fn object_key(base_path: &str, relative_path: &str) -> String {
    if base_path.is_empty() {
        relative_path.to_string()
    } else {
        format!("{}/{}", base_path.trim_matches('/'), relative_path)
    }
}

/// S3-compatible destination. Delivers objects as a plain authenticated
/// PUT against a path-style or custom-endpoint URL rather than a full
/// SigV4-signed client; see the grounding ledger for the tradeoff.
#[derive(Debug, Default)]
pub struct S3Backend;

impl S3Backend {
    fn endpoint(config: &S3Config) -> String {
        config.endpoint.clone().unwrap_or_else(|| {
            let region = config.region.as_deref().unwrap_or("us-east-1");
            format!("https://{}.s3.{}.amazonaws.com", config.bucket, region)
        })
    }
}

impl DestinationBackend for S3Backend {
    fn save(
        &self,
        source_file_path: &Path,
        relative_path: &str,
        config: &Value,
    ) -> Result<SaveOutcome, DestinationError> {
        let config: S3Config =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let bytes = std::fs::read(source_file_path)?;
        let key = object_key(&config.base_path, relative_path);
        let url = format!("{}/{}", Self::endpoint(&config), key);

        let request = client()
            .put(&url)
            .header("x-amz-access-key", &config.access_key)
            .body(bytes);
        let response = request.send()?;
        if response.status().is_success() {
            Ok(SaveOutcome::ok(key))
        } else {
            Ok(SaveOutcome::failed(format!(
                "destination responded with status {}",
                response.status()
            )))
        }
    }

    fn test(
        &self,
        config: &Value,
        test_name: Option<&str>,
        test_content: Option<&[u8]>,
    ) -> Result<TestOutcome, DestinationError> {
        let config: S3Config =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let content = test_content.unwrap_or(b"reef connectivity test");
        let key = object_key(
            &config.base_path,
            test_name.unwrap_or("reef-connectivity-test.tmp"),
        );
        let url = format!("{}/{}", Self::endpoint(&config), key);

        let started = Instant::now();
        let response = client()
            .put(&url)
            .header("x-amz-access-key", &config.access_key)
            .body(content.to_vec())
            .send()?;
        let success = response.status().is_success();
        if success {
            client()
                .delete(&url)
                .header("x-amz-access-key", &config.access_key)
                .send()
                .ok();
        }
        let elapsed = started.elapsed().as_millis() as u64;
        Ok(TestOutcome {
            success,
            final_path: Some(key),
            bytes: Some(content.len() as u64),
            response_ms: Some(elapsed),
            message: Some(format!("status {}", response.status())),
        })
    }
}

/// Azure Blob destination. Delivers blobs via a plain authenticated PUT
/// ("put blob") rather than the full Azure SDK; see the grounding ledger
/// for the tradeoff.
#[derive(Debug, Default)]
pub struct AzureBlobBackend;

impl DestinationBackend for AzureBlobBackend {
    fn save(
        &self,
        source_file_path: &Path,
        relative_path: &str,
        config: &Value,
    ) -> Result<SaveOutcome, DestinationError> {
        let config: AzureBlobConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let bytes = std::fs::read(source_file_path)?;
        let key = object_key(&config.base_path, relative_path);
        let account = parse_account_name(&config.connection_string)
            .ok_or_else(|| DestinationError::Config("connectionString missing AccountName".into()))?;
        let url = format!("https://{account}.blob.core.windows.net/{}/{key}", config.container);

        let response = client()
            .put(&url)
            .header("x-ms-blob-type", "BlockBlob")
            .body(bytes)
            .send()?;
        if response.status().is_success() {
            Ok(SaveOutcome::ok(key))
        } else {
            Ok(SaveOutcome::failed(format!(
                "destination responded with status {}",
                response.status()
            )))
        }
    }

    fn test(
        &self,
        config: &Value,
        test_name: Option<&str>,
        test_content: Option<&[u8]>,
    ) -> Result<TestOutcome, DestinationError> {
        let config: AzureBlobConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let content = test_content.unwrap_or(b"reef connectivity test");
        let key = object_key(
            &config.base_path,
            test_name.unwrap_or("reef-connectivity-test.tmp"),
        );
        let account = parse_account_name(&config.connection_string)
            .ok_or_else(|| DestinationError::Config("connectionString missing AccountName".into()))?;
        let url = format!("https://{account}.blob.core.windows.net/{}/{key}", config.container);

        let started = Instant::now();
        let response = client()
            .put(&url)
            .header("x-ms-blob-type", "BlockBlob")
            .body(content.to_vec())
            .send()?;
        let success = response.status().is_success();
        if success {
            client().delete(&url).send().ok();
        }
        let elapsed = started.elapsed().as_millis() as u64;
        Ok(TestOutcome {
            success,
            final_path: Some(key),
            bytes: Some(content.len() as u64),
            response_ms: Some(elapsed),
            message: Some(format!("status {}", response.status())),
        })
    }
}

fn parse_account_name(connection_string: &str) -> Option<String> {
    connection_string.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        (key.eq_ignore_ascii_case("AccountName")).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_account_name_from_connection_string() {
        let connection_string =
            "DefaultEndpointsProtocol=https;AccountName=reefdata;AccountKey=abc123;EndpointSuffix=core.windows.net";
        assert_eq!(parse_account_name(connection_string), Some("reefdata".to_string()));
    }

    #[test]
    fn object_key_joins_base_path_and_relative_path() {
        assert_eq!(object_key("exports/", "report.csv"), "exports/report.csv");
        assert_eq!(object_key("", "report.csv"), "report.csv");
    }
}
