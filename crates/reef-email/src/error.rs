#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("malformed recipient address: {0}")]
    MalformedAddress(String),
    #[error("template rendering failed: {0}")]
    Template(#[from] tera::Error),
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("message assembly failed: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("http provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid attachment configuration: {0}")]
    Attachment(String),
}
