use std::path::Path;
use std::time::Instant;

use reqwest::blocking::{multipart, Client};
use serde_json::Value;

use crate::backend::{DestinationBackend, SaveOutcome, TestOutcome};
use crate::config::{HttpConfig, WebDavConfig};
use crate::error::DestinationError;

fn client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("reqwest client builds with default tls backend")
}

/// Generic HTTP POST destination. Ships the file as multipart form data
/// under field `file`, with `path` carried as a second form field so the
/// receiving endpoint can route/name the upload.
#[derive(Debug, Default)]
pub struct HttpBackend;

impl DestinationBackend for HttpBackend {
    fn save(
        &self,
        source_file_path: &Path,
        relative_path: &str,
        config: &Value,
    ) -> Result<SaveOutcome, DestinationError> {
        let config: HttpConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let form = multipart::Form::new()
            .text("path", relative_path.to_string())
            .file("file", source_file_path)?;

        let mut request = client().post(&config.url).multipart(form);
        if let Some(token) = &config.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;
        if response.status().is_success() {
            Ok(SaveOutcome::ok(relative_path.to_string()))
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
        _test_name: Option<&str>,
        test_content: Option<&[u8]>,
    ) -> Result<TestOutcome, DestinationError> {
        let config: HttpConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let body = test_content.unwrap_or(b"reef connectivity test").to_vec();
        let started = Instant::now();
        let mut request = client().head(&config.url);
        if let Some(token) = &config.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send()?;
        let elapsed = started.elapsed().as_millis() as u64;
        Ok(TestOutcome {
            success: response.status().is_success(),
            final_path: None,
            bytes: Some(body.len() as u64),
            response_ms: Some(elapsed),
            message: Some(format!("status {}", response.status())),
        })
    }
}

/// WebDAV destination: PUT to `<url>/<relative_path>` with basic auth.
#[derive(Debug, Default)]
pub struct WebDavBackend;

impl DestinationBackend for WebDavBackend {
    fn save(
        &self,
        source_file_path: &Path,
        relative_path: &str,
        config: &Value,
    ) -> Result<SaveOutcome, DestinationError> {
        let config: WebDavConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let bytes = std::fs::read(source_file_path)?;
        let url = format!("{}/{}", config.url.trim_end_matches('/'), relative_path);

        let mut request = client().put(&url).body(bytes);
        if let Some(username) = &config.username {
            request = request.basic_auth(username, config.password.clone());
        }
        let response = request.send()?;
        if response.status().is_success() {
            Ok(SaveOutcome::ok(url))
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
        _test_name: Option<&str>,
        test_content: Option<&[u8]>,
    ) -> Result<TestOutcome, DestinationError> {
        let config: WebDavConfig =
            serde_json::from_value(config.clone()).map_err(|e| DestinationError::Config(e.to_string()))?;
        let body = test_content.unwrap_or(b"reef connectivity test").to_vec();
        let started = Instant::now();
        let mut request = client().head(&config.url);
        if let Some(username) = &config.username {
            request = request.basic_auth(username, config.password.clone());
        }
        let response = request.send()?;
        let elapsed = started.elapsed().as_millis() as u64;
        Ok(TestOutcome {
            success: response.status().is_success(),
            final_path: None,
            bytes: Some(body.len() as u64),
            response_ms: Some(elapsed),
            message: Some(format!("status {}", response.status())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;
    use tempfile::NamedTempFile;
    use tiny_http::{Response, Server};

    #[test]
    fn save_posts_multipart_and_reports_success() {
        let server = Server::http("127.0.0.1:0").expect("bind test server");
        let addr = server.server_addr();
        let url = format!("http://{}", addr);

        let handle = std::thread::spawn(move || {
            let request = server.recv().expect("receive request");
            let mut body = Vec::new();
            request
                .as_reader()
                .read_to_end(&mut body)
                .expect("read body");
            request.respond(Response::from_string("ok")).expect("respond");
            body
        });

        let mut source = NamedTempFile::new().expect("tempfile");
        std::io::Write::write_all(&mut source, b"payload").unwrap();

        let config = serde_json::json!({ "url": url });
        let outcome = HttpBackend
            .save(source.path(), "exports/report.csv", &config)
            .expect("save");

        assert!(outcome.success);
        let body = handle.join().expect("server thread");
        assert!(!body.is_empty());
    }
}
