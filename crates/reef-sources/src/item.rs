use chrono::{DateTime, Utc};

/// One candidate item discovered by [`crate::SourceBackend::list`].
/// `modified` is `None` for protocols that don't expose mtime on listing
/// (HTTP, FTP); those are ordered lexicographically by identifier instead.
#[derive(Debug, Clone)]
pub struct SourceListing {
    pub identifier: String,
    pub modified: Option<DateTime<Utc>>,
}

/// A fetched item (§4.C7 `fetch` result).
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub identifier: String,
    pub content_bytes: Vec<u8>,
}
