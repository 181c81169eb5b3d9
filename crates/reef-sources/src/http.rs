use reqwest::blocking::Client;
use serde_json::Value;

use crate::backend::SourceBackend;
use crate::config::HttpSourceConfig;
use crate::error::SourceError;
use crate::item::SourceListing;

fn client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("reqwest client builds with default tls backend")
}

/// HTTP/FTP source. Plain HTTP endpoints have no directory-listing
/// capability, so `list` always yields the single configured URL as one
/// listing (identifier `""`) rather than a real enumeration — the same
/// simplification §4.C6 documents for the FTP destination backend.
#[derive(Debug, Default)]
pub struct HttpSourceBackend;

impl SourceBackend for HttpSourceBackend {
    fn list(&self, config: &Value, _pattern: &str) -> Result<Vec<SourceListing>, SourceError> {
        let _config: HttpSourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        Ok(vec![SourceListing {
            identifier: String::new(),
            modified: None,
        }])
    }

    fn fetch_one(&self, config: &Value, _identifier: &str) -> Result<Vec<u8>, SourceError> {
        let config: HttpSourceConfig =
            serde_json::from_value(config.clone()).map_err(|e| SourceError::Config(e.to_string()))?;
        let mut request = client().get(&config.url);
        if let Some(token) = &config.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;
        Ok(response.bytes()?.to_vec())
    }
}
