use std::io;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("entity not found")]
    NotFound,
    #[error("failed to read or write the catalog file")]
    Io(#[source] io::Error),
    #[error("catalog file is not valid JSON: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl From<io::Error> for CatalogError {
    fn from(err: io::Error) -> Self {
        CatalogError::Io(err)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Serialization(err)
    }
}
