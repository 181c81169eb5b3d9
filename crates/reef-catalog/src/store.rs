use chrono::{DateTime, Utc};
use reef_types::{
    Connection, ConnectionId, DeltaSyncState, Dependency, DependencyId, Destination,
    DestinationId, Execution, ExecutionId, ImportProfile, ImportProfileId, Job, JobId, Profile,
    ProfileId, WebhookTrigger, WebhookTriggerId,
};

use crate::error::CatalogError;

/// Persistence seam for every catalog entity (§3).
///
/// The concrete RDBMS-backed implementation a production deployment would
/// run against is out of scope for this crate; what lives here is the trait
/// boundary plus [`crate::InMemoryCatalogStore`] and
/// [`crate::JsonFileCatalogStore`] reference implementations, both useful
/// for tests and single-node installs.
pub trait CatalogStore: Send + Sync {
    fn get_connection(&self, id: ConnectionId) -> Result<Option<Connection>, CatalogError>;
    fn list_connections(&self) -> Result<Vec<Connection>, CatalogError>;
    fn put_connection(&self, connection: Connection) -> Result<(), CatalogError>;
    fn delete_connection(&self, id: ConnectionId) -> Result<(), CatalogError>;

    fn get_destination(&self, id: DestinationId) -> Result<Option<Destination>, CatalogError>;
    fn list_destinations(&self) -> Result<Vec<Destination>, CatalogError>;
    fn put_destination(&self, destination: Destination) -> Result<(), CatalogError>;
    fn delete_destination(&self, id: DestinationId) -> Result<(), CatalogError>;

    fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, CatalogError>;
    fn list_profiles(&self) -> Result<Vec<Profile>, CatalogError>;
    fn put_profile(&self, profile: Profile) -> Result<(), CatalogError>;
    fn delete_profile(&self, id: ProfileId) -> Result<(), CatalogError>;

    fn get_import_profile(&self, id: ImportProfileId) -> Result<Option<ImportProfile>, CatalogError>;
    fn list_import_profiles(&self) -> Result<Vec<ImportProfile>, CatalogError>;
    fn put_import_profile(&self, profile: ImportProfile) -> Result<(), CatalogError>;
    fn delete_import_profile(&self, id: ImportProfileId) -> Result<(), CatalogError>;

    fn get_dependency(&self, id: DependencyId) -> Result<Option<Dependency>, CatalogError>;
    fn list_dependencies(&self) -> Result<Vec<Dependency>, CatalogError>;
    fn put_dependency(&self, dependency: Dependency) -> Result<(), CatalogError>;
    fn delete_dependency(&self, id: DependencyId) -> Result<(), CatalogError>;

    fn get_job(&self, id: JobId) -> Result<Option<Job>, CatalogError>;
    fn list_jobs(&self) -> Result<Vec<Job>, CatalogError>;
    fn put_job(&self, job: Job) -> Result<(), CatalogError>;
    fn delete_job(&self, id: JobId) -> Result<(), CatalogError>;

    fn get_execution(&self, id: ExecutionId) -> Result<Option<Execution>, CatalogError>;
    fn list_executions(&self) -> Result<Vec<Execution>, CatalogError>;
    /// Executions belonging to one profile, most recent first.
    fn list_executions_for_profile(&self, profile_id: ProfileId) -> Result<Vec<Execution>, CatalogError>;
    fn put_execution(&self, execution: Execution) -> Result<(), CatalogError>;
    fn delete_execution(&self, id: ExecutionId) -> Result<(), CatalogError>;

    fn get_webhook_trigger(&self, id: WebhookTriggerId) -> Result<Option<WebhookTrigger>, CatalogError>;
    fn list_webhook_triggers(&self) -> Result<Vec<WebhookTrigger>, CatalogError>;
    fn put_webhook_trigger(&self, trigger: WebhookTrigger) -> Result<(), CatalogError>;
    fn delete_webhook_trigger(&self, id: WebhookTriggerId) -> Result<(), CatalogError>;

    fn get_delta_state(
        &self,
        profile_id: ProfileId,
        reef_id: &str,
    ) -> Result<Option<DeltaSyncState>, CatalogError>;
    fn list_delta_states(&self, profile_id: ProfileId) -> Result<Vec<DeltaSyncState>, CatalogError>;
    fn put_delta_state(&self, state: DeltaSyncState) -> Result<(), CatalogError>;
    /// Drop one tracked row, e.g. `reset_rows` for an explicit id list.
    fn delete_delta_state(&self, profile_id: ProfileId, reef_id: &str) -> Result<(), CatalogError>;
    /// Drop tracked rows that have been marked deleted since before `cutoff`.
    /// Returns the number of entries removed.
    fn prune_delta_states(
        &self,
        profile_id: ProfileId,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, CatalogError>;
    /// Drop every tracked row for a profile, e.g. after switching its delta
    /// strategy or reef id expression.
    fn reset_delta_state(&self, profile_id: ProfileId) -> Result<(), CatalogError>;
}
