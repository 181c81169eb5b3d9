#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    #[error("duplicate ReefId {0:?} in input batch")]
    DuplicateReefId(String),
    #[error("row is missing a ReefId in column {0:?}")]
    NullReefId(String),
    #[error(transparent)]
    Catalog(#[from] reef_catalog::CatalogError),
}
