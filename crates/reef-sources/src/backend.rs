use serde_json::Value;

use crate::error::SourceError;
use crate::item::SourceListing;

/// One protocol's implementation of list/fetch/archive. Mirrors
/// `reef_destinations::DestinationBackend` on the read side.
pub trait SourceBackend: Send + Sync {
    /// Enumerate candidate items. `pattern` is a glob against the
    /// identifier (filename, object key, ...).
    fn list(&self, config: &Value, pattern: &str) -> Result<Vec<SourceListing>, SourceError>;

    fn fetch_one(&self, config: &Value, identifier: &str) -> Result<Vec<u8>, SourceError>;

    /// Move `identifier` to the backend's configured archive location.
    /// Local/NetworkShare/S3/AzureBlob support this; HTTP/FTP/SFTP report
    /// "not supported" since the remote endpoint has no addressable
    /// archive folder of its own.
    fn archive(&self, config: &Value, identifier: &str) -> Result<(), SourceError> {
        let _ = (config, identifier);
        Err(SourceError::NotSupported)
    }
}
