use reef_retry::{RetryExecutor, RetryStrategyConfig};
use reef_types::{FailureAction, SelectionRule};
pub use reef_types::DestinationKind as SourceKind;
use serde_json::Value;
use std::time::Duration;

use crate::backend::SourceBackend;
use crate::error::SourceError;
use crate::http::HttpSourceBackend;
use crate::item::SourceItem;
use crate::local::{LocalSourceBackend, NetworkShareSourceBackend};
use crate::object_store::{AzureBlobSourceBackend, S3SourceBackend};
use crate::sftp::SftpSourceBackend;

fn default_retry_config(retry_count: u32) -> RetryStrategyConfig {
    RetryStrategyConfig {
        strategy: reef_retry::RetryStrategyType::Exponential,
        max_attempts: retry_count.max(1),
        base_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(30),
        jitter: 0.2,
    }
}

/// Polymorphic entry point for §4.C7. FTP has no dedicated backend —
/// per the same documented simplification as the destination dispatcher,
/// it is routed through [`HttpSourceBackend`].
pub struct Dispatcher;

impl Dispatcher {
    fn backend(kind: SourceKind) -> Result<Box<dyn SourceBackend>, SourceError> {
        Ok(match kind {
            SourceKind::Local => Box::new(LocalSourceBackend),
            SourceKind::NetworkShare => Box::new(NetworkShareSourceBackend::default()),
            SourceKind::Http | SourceKind::Ftp => Box::new(HttpSourceBackend),
            SourceKind::Sftp => Box::new(SftpSourceBackend),
            SourceKind::S3 => Box::new(S3SourceBackend),
            SourceKind::AzureBlob => Box::new(AzureBlobSourceBackend),
            SourceKind::WebDav | SourceKind::Email => return Err(SourceError::NotSupported),
        })
    }

    /// Fetch the item(s) selected by `selection_rule` out of everything
    /// `file_pattern` matches. On exhausted retries, `on_source_failure`
    /// decides between raising and returning an empty list (§4.C7).
    pub fn fetch(
        &self,
        kind: SourceKind,
        config: &Value,
        file_pattern: &str,
        selection_rule: SelectionRule,
        retry_count: u32,
        on_source_failure: FailureAction,
    ) -> Result<Vec<SourceItem>, SourceError> {
        let executor = RetryExecutor::new(default_retry_config(retry_count));
        let result = executor.run(|_attempt| self.try_fetch(kind, config, file_pattern, selection_rule));

        match result {
            Ok(items) => Ok(items),
            Err(e) if on_source_failure == FailureAction::Skip => {
                let _ = e;
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn try_fetch(
        &self,
        kind: SourceKind,
        config: &Value,
        file_pattern: &str,
        selection_rule: SelectionRule,
    ) -> Result<Vec<SourceItem>, SourceError> {
        let backend = Self::backend(kind)?;
        let mut listings = backend.list(config, file_pattern)?;
        if listings.is_empty() {
            return Err(SourceError::NoMatch(file_pattern.to_string()));
        }

        listings.sort_by(|a, b| (a.modified, &a.identifier).cmp(&(b.modified, &b.identifier)));
        let selected: Vec<_> = match selection_rule {
            SelectionRule::All => listings,
            SelectionRule::Oldest => listings.into_iter().take(1).collect(),
            SelectionRule::Newest => listings.into_iter().next_back().into_iter().collect(),
        };

        selected
            .into_iter()
            .map(|listing| {
                let content_bytes = backend.fetch_one(config, &listing.identifier)?;
                Ok(SourceItem {
                    identifier: listing.identifier,
                    content_bytes,
                })
            })
            .collect()
    }

    pub fn archive(&self, kind: SourceKind, config: &Value, identifier: &str) -> Result<(), SourceError> {
        Self::backend(kind)?.archive(config, identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn fetch_newest_returns_the_single_most_recently_modified_match() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join("a.csv"), b"older").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        fs::write(td.path().join("b.csv"), b"newer").unwrap();

        let config = serde_json::json!({ "basePath": td.path().to_string_lossy() });
        let dispatcher = Dispatcher;
        let items = dispatcher
            .fetch(SourceKind::Local, &config, "*.csv", SelectionRule::Newest, 2, FailureAction::Fail)
            .expect("fetch");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].content_bytes, b"newer");
    }

    #[test]
    fn fetch_all_returns_every_match() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join("a.csv"), b"1").unwrap();
        fs::write(td.path().join("b.csv"), b"2").unwrap();

        let config = serde_json::json!({ "basePath": td.path().to_string_lossy() });
        let dispatcher = Dispatcher;
        let items = dispatcher
            .fetch(SourceKind::Local, &config, "*.csv", SelectionRule::All, 2, FailureAction::Fail)
            .expect("fetch");

        assert_eq!(items.len(), 2);
    }

    #[test]
    fn skip_on_source_failure_returns_empty_list_instead_of_raising() {
        let td = tempdir().expect("tempdir");
        let config = serde_json::json!({ "basePath": td.path().to_string_lossy() });
        let dispatcher = Dispatcher;
        let items = dispatcher
            .fetch(SourceKind::Local, &config, "*.csv", SelectionRule::All, 1, FailureAction::Skip)
            .expect("fetch does not raise under Skip policy");

        assert!(items.is_empty());
    }
}
