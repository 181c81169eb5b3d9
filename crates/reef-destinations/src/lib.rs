//! Destination delivery backends (§4.C6): save/test/compensate across the
//! eight supported destination kinds, dispatched through a single retrying
//! entry point.

mod backend;
mod config;
mod dispatcher;
mod error;
mod ftp;
mod http;
mod local;
mod object_store;
mod path;

pub use backend::{DestinationBackend, SaveOutcome, TestOutcome};
pub use config::{
    AzureBlobConfig, FtpConfig, HttpConfig, LocalConfig, NetworkShareConfig, S3Config, SftpConfig, WebDavConfig,
};
pub use dispatcher::{Dispatcher, DestinationKind};
pub use error::DestinationError;
pub use ftp::{FtpBackend, SftpBackend};
pub use http::{HttpBackend, WebDavBackend};
pub use local::{LocalBackend, NetworkShareBackend};
pub use object_store::{AzureBlobBackend, S3Backend};
pub use path::relative_destination_path;
