use reef_types::ProfileId;

#[derive(Debug, thiserror::Error)]
pub enum DepsError {
    #[error("dependency graph has a cycle reachable from profile {0}")]
    CycleDetected(ProfileId),
    #[error("a profile cannot depend on itself ({0})")]
    SelfEdge(ProfileId),
    #[error("profile {0} is not in the catalog")]
    UnknownProfile(ProfileId),
    #[error("dependency from {dependent} to {prerequisite} already exists")]
    DuplicateEdge {
        dependent: ProfileId,
        prerequisite: ProfileId,
    },
    #[error(transparent)]
    Catalog(#[from] reef_catalog::CatalogError),
}
