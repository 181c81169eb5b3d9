use std::path::Path;

use reef_retry::{RetryExecutor, RetryStrategyConfig};
pub use reef_types::DestinationKind;
use serde_json::Value;
use std::time::Duration;

use crate::backend::{DestinationBackend, SaveOutcome, TestOutcome};
use crate::error::DestinationError;
use crate::ftp::{FtpBackend, SftpBackend};
use crate::http::{HttpBackend, WebDavBackend};
use crate::local::{LocalBackend, NetworkShareBackend};
use crate::object_store::{AzureBlobBackend, S3Backend};
use crate::path::relative_destination_path;

/// Placeholder backend for [`DestinationKind::Email`]. The actual send
/// pipeline lives in `reef-email`; at dispatcher level `test` only proves
/// the destination is reachable by writing a temp file and returning its
/// path (§4.C6).
#[derive(Debug, Default)]
struct EmailBackend;

impl DestinationBackend for EmailBackend {
    fn save(&self, _source_file_path: &Path, _relative_path: &str, _config: &Value) -> Result<SaveOutcome, DestinationError> {
        Err(DestinationError::NotSupported)
    }

    fn test(
        &self,
        _config: &Value,
        test_name: Option<&str>,
        test_content: Option<&[u8]>,
    ) -> Result<TestOutcome, DestinationError> {
        let content = test_content.unwrap_or(b"reef connectivity test");
        let mut path = std::env::temp_dir();
        path.push(test_name.unwrap_or("reef-email-connectivity-test.tmp"));
        std::fs::write(&path, content)?;
        Ok(TestOutcome {
            success: true,
            final_path: Some(path.display().to_string()),
            bytes: Some(content.len() as u64),
            response_ms: Some(0),
            message: None,
        })
    }
}

fn default_retry_config() -> RetryStrategyConfig {
    RetryStrategyConfig {
        strategy: reef_retry::RetryStrategyType::Exponential,
        max_attempts: 3,
        base_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(8),
        jitter: 0.2,
    }
}

/// Polymorphic entry point for §4.C6. Resolves a [`DestinationKind`] to its
/// backend and wraps `save` in the retry policy: a non-success result
/// without an exception is treated as transient and retried; an exception
/// classified [`DestinationError::is_transient`] as non-transient
/// short-circuits the loop immediately.
pub struct Dispatcher {
    retry_config: RetryStrategyConfig,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            retry_config: default_retry_config(),
        }
    }
}

impl Dispatcher {
    pub fn new(retry_config: RetryStrategyConfig) -> Self {
        Self { retry_config }
    }

    fn backend(kind: DestinationKind) -> Box<dyn DestinationBackend> {
        match kind {
            DestinationKind::Local => Box::new(LocalBackend),
            DestinationKind::NetworkShare => Box::new(NetworkShareBackend),
            DestinationKind::Http => Box::new(HttpBackend),
            DestinationKind::WebDav => Box::new(WebDavBackend),
            DestinationKind::Ftp => Box::new(FtpBackend),
            DestinationKind::Sftp => Box::new(SftpBackend),
            DestinationKind::S3 => Box::new(S3Backend),
            DestinationKind::AzureBlob => Box::new(AzureBlobBackend),
            DestinationKind::Email => Box::new(EmailBackend),
        }
    }

    pub fn save(
        &self,
        kind: DestinationKind,
        source_file_path: &Path,
        destination_path: &Path,
        config: &Value,
    ) -> SaveOutcome {
        let backend = Self::backend(kind);
        let relative_path = relative_destination_path(destination_path);
        let relative_path = relative_path.to_string_lossy().into_owned();

        let executor = RetryExecutor::new(self.retry_config.clone());
        let result: Result<SaveOutcome, SaveOutcome> = executor.run(|_attempt| {
            match backend.save(source_file_path, &relative_path, config) {
                Ok(outcome) if outcome.success => Ok(outcome),
                Ok(outcome) => Err(outcome),
                Err(e) if e.is_transient() => Err(SaveOutcome::failed(e.to_string())),
                Err(e) => Ok(SaveOutcome::failed(e.to_string())),
            }
        });

        result.unwrap_or_else(|e| e)
    }

    pub fn test(
        &self,
        kind: DestinationKind,
        config: &Value,
        test_name: Option<&str>,
        test_content: Option<&[u8]>,
    ) -> Result<TestOutcome, DestinationError> {
        Self::backend(kind).test(config, test_name, test_content)
    }

    pub fn compensate(&self, kind: DestinationKind, path: &str, config: &Value) -> Result<(), DestinationError> {
        if !kind.supports_compensate() {
            return Err(DestinationError::NotSupported);
        }
        Self::backend(kind).compensate(path, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn save_succeeds_on_first_attempt_for_local_backend() {
        let td = tempdir().expect("tempdir");
        let source_dir = tempdir().expect("tempdir");
        let source = source_dir.path().join("report.csv");
        fs::write(&source, b"a,b,c").unwrap();

        let dispatcher = Dispatcher::default();
        let config = serde_json::json!({ "basePath": td.path().to_string_lossy() });
        let outcome = dispatcher.save(
            DestinationKind::Local,
            &source,
            Path::new("48213/exports/report.csv"),
            &config,
        );

        assert!(outcome.success);
        assert!(outcome.final_path.unwrap().ends_with("exports/report.csv"));
    }

    #[test]
    fn compensate_reports_not_supported_for_sftp() {
        let dispatcher = Dispatcher::default();
        let result = dispatcher.compensate(DestinationKind::Sftp, "/remote/file.csv", &Value::Null);
        assert!(matches!(result, Err(DestinationError::NotSupported)));
    }

    #[test]
    fn save_retries_on_non_success_without_exception() {
        let td = tempdir().expect("tempdir");
        let source_dir = tempdir().expect("tempdir");
        let source = source_dir.path().join("report.csv");
        fs::write(&source, b"a,b,c").unwrap();

        // Point base_path at a file (not a directory) so every LocalBackend
        // write attempt fails with an io error classified as non-transient,
        // exercising the short-circuit path rather than exhausting retries.
        let bogus_base = source_dir.path().join("not-a-directory");
        fs::write(&bogus_base, b"occupied").unwrap();

        let fast_retry = RetryStrategyConfig {
            strategy: reef_retry::RetryStrategyType::Immediate,
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            jitter: 0.0,
        };
        let dispatcher = Dispatcher::new(fast_retry);
        let config = serde_json::json!({ "basePath": bogus_base.to_string_lossy() });
        let outcome = dispatcher.save(DestinationKind::Local, &source, Path::new("report.csv"), &config);

        assert!(!outcome.success);
    }
}
