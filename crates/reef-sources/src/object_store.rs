use reqwest::blocking::Client;
use serde_json::Value;

use crate::backend::SourceBackend;
use crate::config::{AzureBlobSourceConfig, S3SourceConfig};
use crate::error::SourceError;
use crate::item::SourceListing;

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

/// S3-compatible source. Like the destination counterpart, listing is
/// not implemented against the real bucket-listing API — `fetch` expects
/// the caller to pass the object key directly as `identifier` (typically
/// supplied out-of-band, since this corpus carries no AWS SDK dependency).
#[derive(Debug, Default)]
pub struct S3SourceBackend;

impl S3SourceBackend {
    fn endpoint(config: &S3SourceConfig) -> String {
        config.endpoint.clone().unwrap_or_else(|| {
            let region = config.region.as_deref().unwrap_or("us-east-1");
            format!("https://{}.s3.{}.amazonaws.com", config.bucket, region)
        })
    }
}

impl SourceBackend for S3SourceBackend {
    fn list(&self, config: &Value, pattern: &str) -> Result<Vec<SourceListing>, SourceError> {
        let config: S3SourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        Ok(vec![SourceListing {
            identifier: object_key(&config.base_path, pattern),
            modified: None,
        }])
    }

    fn fetch_one(&self, config: &Value, identifier: &str) -> Result<Vec<u8>, SourceError> {
        let config: S3SourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        let url = format!("{}/{}", Self::endpoint(&config), identifier);
        let response = client()
            .get(&url)
            .header("x-amz-access-key", &config.access_key)
            .send()?;
        Ok(response.bytes()?.to_vec())
    }

    fn archive(&self, config: &Value, identifier: &str) -> Result<(), SourceError> {
        let config: S3SourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        let archive_prefix = config
            .archive_prefix
            .clone()
            .ok_or_else(|| SourceError::Config("archivePrefix not configured".into()))?;
        let bytes = self.fetch_one(&serde_json::to_value(&config).unwrap(), identifier)?;
        let destination = format!("{}/{}", Self::endpoint(&config), object_key(&archive_prefix, identifier));
        client()
            .put(&destination)
            .header("x-amz-access-key", &config.access_key)
            .body(bytes)
            .send()?;
        client()
            .delete(format!("{}/{}", Self::endpoint(&config), identifier))
            .header("x-amz-access-key", &config.access_key)
            .send()?;
        Ok(())
    }
}

/// Azure Blob source. Same out-of-band identifier convention as
/// [`S3SourceBackend`].
#[derive(Debug, Default)]
pub struct AzureBlobSourceBackend;

fn parse_account_name(connection_string: &str) -> Option<String> {
    connection_string.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        (key.eq_ignore_ascii_case("AccountName")).then(|| value.to_string())
    })
}

impl SourceBackend for AzureBlobSourceBackend {
    fn list(&self, config: &Value, pattern: &str) -> Result<Vec<SourceListing>, SourceError> {
        let config: AzureBlobSourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        Ok(vec![SourceListing {
            identifier: object_key(&config.base_path, pattern),
            modified: None,
        }])
    }

    fn fetch_one(&self, config: &Value, identifier: &str) -> Result<Vec<u8>, SourceError> {
        let config: AzureBlobSourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        let account = parse_account_name(&config.connection_string)
            .ok_or_else(|| SourceError::Config("connectionString missing AccountName".into()))?;
        let url = format!(
            "https://{account}.blob.core.windows.net/{}/{identifier}",
            config.container
        );
        let response = client().get(&url).send()?;
        Ok(response.bytes()?.to_vec())
    }
}
