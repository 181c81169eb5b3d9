#[derive(Debug, thiserror::Error)]
pub enum DestinationError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ssh/sftp error: {0}")]
    Ssh(String),
    #[error("invalid destination configuration: {0}")]
    Config(String),
    #[error("operation not supported for this destination kind")]
    NotSupported,
    #[error("{0}")]
    Remote(String),
}

impl DestinationError {
    /// §4.C6 retry policy: an exception "classified as non-transient"
    /// short-circuits `save` instead of retrying. Connection-level and
    /// timeout failures are presumed transient; everything else (bad
    /// config, auth failure, protocol errors) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            DestinationError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            DestinationError::Http(e) => e.is_timeout() || e.is_connect(),
            DestinationError::Ssh(_) => true,
            DestinationError::Config(_) | DestinationError::NotSupported => false,
            DestinationError::Remote(_) => true,
        }
    }
}
