//! Filename template substitution for the Split and local-file-import
//! phases (§4.C8 phase 6, §4.C9 "local-file target variant").
//!
//! Placeholders: `{profile}` `{splitkey}` `{timestamp}` `{date}` `{time}`
//! `{guid}` `{format}`.

use chrono::{DateTime, Utc};

pub struct FilenameContext<'a> {
    pub profile_code: &'a str,
    pub split_key: Option<&'a str>,
    pub now: DateTime<Utc>,
    pub format_extension: &'a str,
}

fn new_guid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Expand a `filename_template` against one run's context. Unmatched
/// placeholders are left untouched rather than erroring, matching a
/// best-effort string template rather than a strict one.
pub fn expand(template: &str, ctx: &FilenameContext) -> String {
    template
        .replace("{profile}", ctx.profile_code)
        .replace("{splitkey}", ctx.split_key.unwrap_or("unknown"))
        .replace("{timestamp}", &ctx.now.timestamp().to_string())
        .replace("{date}", &ctx.now.format("%Y-%m-%d").to_string())
        .replace("{time}", &ctx.now.format("%H%M%S").to_string())
        .replace("{guid}", &new_guid())
        .replace("{format}", ctx.format_extension)
}
