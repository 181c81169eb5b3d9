use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::WebhookTriggerId;

/// Literal prefix for generated webhook tokens (§6).
pub const WEBHOOK_TOKEN_PREFIX: &str = "reef_wh_";

/// Which catalog entity a webhook trigger fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum WebhookTarget {
    Profile(uuid::Uuid),
    Job(uuid::Uuid),
    ImportProfile(uuid::Uuid),
}

/// A presented webhook token is hashed and matched; the raw token is never
/// stored (§3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookTrigger {
    pub id: WebhookTriggerId,
    pub target: WebhookTarget,
    /// `base64(sha256(token))`.
    pub token_hash: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub trigger_count: u64,
    /// `0` = unlimited, `1` = once per window.
    pub rate_limit_per_hour: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_prefix_matches_spec() {
        assert_eq!(WEBHOOK_TOKEN_PREFIX, "reef_wh_");
    }
}
