//! Source fetchers (§4.C7): list/fetch/archive across the seven supported
//! source kinds, dispatched through a single retrying entry point.

mod backend;
mod config;
mod dispatcher;
mod error;
mod http;
mod item;
mod local;
mod object_store;
mod sftp;

pub use backend::SourceBackend;
pub use config::{AzureBlobSourceConfig, HttpSourceConfig, LocalSourceConfig, S3SourceConfig, SftpSourceConfig};
pub use dispatcher::{Dispatcher, SourceKind};
pub use error::SourceError;
pub use http::HttpSourceBackend;
pub use item::{SourceItem, SourceListing};
pub use local::{LocalSourceBackend, NetworkShareSourceBackend};
pub use object_store::{AzureBlobSourceBackend, S3SourceBackend};
pub use sftp::SftpSourceBackend;
