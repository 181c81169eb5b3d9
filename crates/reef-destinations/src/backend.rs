use std::path::Path;

use serde_json::Value;

use crate::error::DestinationError;

/// Result of `save` (§4.C6).
#[derive(Debug, Clone, Default)]
pub struct SaveOutcome {
    pub success: bool,
    pub final_path: Option<String>,
    pub error: Option<String>,
}

impl SaveOutcome {
    pub fn ok(final_path: impl Into<String>) -> Self {
        Self {
            success: true,
            final_path: Some(final_path.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            final_path: None,
            error: Some(error.into()),
        }
    }
}

/// Result of `test` (§4.C6).
#[derive(Debug, Clone, Default)]
pub struct TestOutcome {
    pub success: bool,
    pub final_path: Option<String>,
    pub bytes: Option<u64>,
    pub response_ms: Option<u64>,
    pub message: Option<String>,
}

/// One delivery protocol's implementation of save/test/compensate.
/// [`crate::Dispatcher`] is the polymorphic entry point callers use;
/// backends themselves only need to know their own wire protocol.
pub trait DestinationBackend: Send + Sync {
    fn save(
        &self,
        source_file_path: &Path,
        relative_path: &str,
        config: &Value,
    ) -> Result<SaveOutcome, DestinationError>;

    fn test(
        &self,
        config: &Value,
        test_name: Option<&str>,
        test_content: Option<&[u8]>,
    ) -> Result<TestOutcome, DestinationError>;

    /// Best-effort removal of a previously-saved artifact. Default is
    /// "not supported"; kinds listed in
    /// [`reef_types::DestinationKind::supports_compensate`] override this.
    fn compensate(&self, path: &str, config: &Value) -> Result<(), DestinationError> {
        let _ = (path, config);
        Err(DestinationError::NotSupported)
    }
}
