use reef_types::{ConnectionId, JobId, ProfileId};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("catalog error: {0}")]
    Catalog(#[from] reef_catalog::CatalogError),
    #[error("dependency resolution error: {0}")]
    Deps(#[from] reef_deps::DepsError),
    #[error("failed to decrypt connection string: {0}")]
    Decrypt(#[from] reef_encrypt::EncryptError),
    #[error("profile {0:?} no longer exists in the catalog")]
    UnknownProfile(ProfileId),
    #[error("profile {0:?} references unknown connection {1:?}")]
    UnknownConnection(ProfileId, ConnectionId),
    #[error("profile {0:?} references an unknown destination")]
    UnknownDestination(ProfileId),
    #[error("job {0:?} timed out after {1} minute(s)")]
    TimedOut(JobId, u32),
    #[error("job {0:?} was cancelled")]
    Cancelled(JobId),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
