#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ssh/sftp error: {0}")]
    Ssh(String),
    #[error("invalid source configuration: {0}")]
    Config(String),
    #[error("operation not supported for this source kind")]
    NotSupported,
    #[error("no source item matched pattern {0:?}")]
    NoMatch(String),
}

impl SourceError {
    /// Same transient/permanent split as `reef_destinations::DestinationError`
    /// (§4.C6's retry rule applies symmetrically to §4.C7 fetches).
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            SourceError::Http(e) => e.is_timeout() || e.is_connect(),
            SourceError::Ssh(_) => true,
            SourceError::Config(_) | SourceError::NotSupported | SourceError::NoMatch(_) => false,
        }
    }
}
