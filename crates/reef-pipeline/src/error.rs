use reef_catalog::CatalogError;
use reef_delta::DeltaError;
use reef_deps::DepsError;
use reef_destinations::DestinationError;
use reef_email::EmailError;
use reef_sources::SourceError;

/// Error taxonomy for §4.C8/§4.C9 (§7): every pipeline-internal failure
/// collapses into one of these before it is recorded on an `Execution`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("transient transport error: {0}")]
    TransientTransport(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("parse error at line {line}: {message}")]
    Parse { line: u64, message: String },
    #[error("row error: {0}")]
    Row(String),
    #[error("source fetch failed: {0}")]
    Source(String),
    #[error("fatal error: {0}")]
    Fatal(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Delta(#[from] DeltaError),
    #[error(transparent)]
    Deps(#[from] DepsError),
    #[error(transparent)]
    Destination(#[from] DestinationError),
    #[error(transparent)]
    SourceDispatch(#[from] SourceError),
    #[error(transparent)]
    Email(#[from] EmailError),
    #[error("template rendering failed: {0}")]
    Template(#[from] tera::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl PipelineError {
    /// §7: destination-delivery and transient-transport failures are the
    /// only classes a caller should consider retryable at the pipeline
    /// level (DB-level retry, §4.C8 phase 3, is handled separately by
    /// `db::is_transient`).
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::TransientTransport(_) => true,
            PipelineError::Destination(e) => e.is_transient(),
            PipelineError::SourceDispatch(e) => e.is_transient(),
            _ => false,
        }
    }
}
