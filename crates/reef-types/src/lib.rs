//! Core domain types for Reef.
//!
//! This crate defines the catalog entities from the data model
//! (`Connection`, `Destination`, `Profile`, `ImportProfile`, `Dependency`,
//! `Execution`, `Job`, `WebhookTrigger`), the row-value representation used
//! by the delta-sync and import pipelines, and the cross-field validation
//! each entity must satisfy before it is written to the catalog.
//!
//! Durations are accepted as either humantime strings or milliseconds via
//! [`reef_duration`]'s serde helpers; most entities otherwise use plain
//! serde derives.

mod connection;
mod delta_config;
mod delta_state;
mod dependency;
mod destination;
mod execution;
mod ids;
mod import_profile;
mod job;
mod profile;
mod schedule;
mod value;
mod webhook;

pub use connection::{Connection, ConnectionKind};
pub use delta_config::{
    DeltaSyncConfig, DuplicateStrategy, HashAlgorithm, NullStrategy, ReefIdNormalization,
};
pub use delta_state::DeltaSyncState;
pub use dependency::Dependency;
pub use destination::{Destination, DestinationKind};
pub use execution::{
    Execution, ExecutionStatus, SplitRecord, SplitStatus, TriggerSource,
};
pub use ids::{
    ConnectionId, DependencyId, DestinationId, ExecutionId, ImportProfileId, JobId, ProfileId,
    WebhookTriggerId,
};
pub use import_profile::{
    ColumnMapping, FailureAction, FailurePolicy, ImportProfile, ImportTargetKind, LoadStrategy,
    RowFailureAction, SelectionRule, SourceFormat,
};
pub use job::{Job, CIRCUIT_BREAKER_THRESHOLD};
pub use profile::{EmailExportConfig, OutputFormat, Profile, ProfileValidationError, SplitConfig};
pub use schedule::{Schedule, ScheduleError};
pub use value::{ColumnValue, Row};
pub use webhook::{WebhookTarget, WebhookTrigger, WEBHOOK_TOKEN_PREFIX};
