use chrono::{Duration, Utc};
use reef_catalog::CatalogStore;
use reef_types::{ExecutionStatus, ProfileId};

use crate::error::DepsError;
use crate::graph::DependencyGraph;

/// How recent a prerequisite's successful run must be to count as
/// "completed" for gating purposes.
const COMPLETION_WINDOW: Duration = Duration::hours(1);

/// `check_completed` (§4.C5): for each direct prerequisite of `profile`, is
/// there a `Success` execution completed within the last hour? Returns the
/// overall verdict plus the prerequisites still pending.
pub fn check_completed(
    catalog: &dyn CatalogStore,
    graph: &DependencyGraph,
    profile: ProfileId,
) -> Result<(bool, Vec<ProfileId>), DepsError> {
    let now = Utc::now();
    let mut pending = Vec::new();

    for &prerequisite in graph.prerequisites_of(profile) {
        let executions = catalog.list_executions_for_profile(prerequisite)?;
        let satisfied = executions.iter().any(|execution| {
            execution.status == ExecutionStatus::Success
                && execution
                    .completed_at
                    .map(|at| now - at <= COMPLETION_WINDOW)
                    .unwrap_or(false)
        });
        if !satisfied {
            pending.push(prerequisite);
        }
    }

    Ok((pending.is_empty(), pending))
}

/// Validate a candidate edge before it is written to the catalog: both
/// profiles must exist, the edge must not be self-referential, must not
/// duplicate an existing edge, and must not introduce a cycle.
pub fn validate_edge(
    catalog: &dyn CatalogStore,
    graph: &DependencyGraph,
    dependent: ProfileId,
    prerequisite: ProfileId,
) -> Result<(), DepsError> {
    if dependent == prerequisite {
        return Err(DepsError::SelfEdge(dependent));
    }
    if catalog.get_profile(dependent)?.is_none() {
        return Err(DepsError::UnknownProfile(dependent));
    }
    if catalog.get_profile(prerequisite)?.is_none() {
        return Err(DepsError::UnknownProfile(prerequisite));
    }
    if graph.prerequisites_of(dependent).contains(&prerequisite) {
        return Err(DepsError::DuplicateEdge {
            dependent,
            prerequisite,
        });
    }
    if graph.would_create_cycle(dependent, prerequisite) {
        return Err(DepsError::CycleDetected(dependent));
    }
    Ok(())
}
