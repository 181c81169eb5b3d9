use std::collections::HashMap;

use reef_types::{
    Connection, DeltaSyncState, Dependency, Destination, Execution, ImportProfile, Job, Profile,
    WebhookTrigger,
};
use serde::{Deserialize, Serialize};

/// The whole catalog, held in memory and (for [`crate::JsonFileCatalogStore`])
/// mirrored to a single JSON file on every mutation.
///
/// Real deployments back this trait with an RDBMS (out of scope here); this
/// snapshot exists so tests and small single-node installs have a working
/// implementation of the same [`crate::CatalogStore`] seam. Every table is
/// keyed by the entity id's string form rather than the id type itself, so
/// this always round-trips as a plain JSON object regardless of how a
/// newtype id happens to serialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub connections: HashMap<String, Connection>,
    pub destinations: HashMap<String, Destination>,
    pub profiles: HashMap<String, Profile>,
    pub import_profiles: HashMap<String, ImportProfile>,
    pub dependencies: HashMap<String, Dependency>,
    pub jobs: HashMap<String, Job>,
    pub executions: HashMap<String, Execution>,
    pub webhook_triggers: HashMap<String, WebhookTrigger>,
    /// Keyed by `"{profile_id}|{reef_id}"`.
    pub delta_states: HashMap<String, DeltaSyncState>,
}

pub(crate) fn delta_key(profile_id: reef_types::ProfileId, reef_id: &str) -> String {
    format!("{profile_id}|{reef_id}")
}
