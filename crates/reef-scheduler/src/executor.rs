use std::sync::{Arc, Mutex as SyncMutex};

use chrono::Utc;
use reef_catalog::CatalogStore;
use reef_delta::DeltaSyncEngine;
use reef_deps::{check_completed, DependencyGraph};
use reef_destinations::Dispatcher as DestinationDispatcher;
use reef_encrypt::Encryptor;
use reef_pipeline::{DbClient, ProfileRunInputs, Reporter};
use reef_throttle::NotificationThrottle;
use reef_types::{Execution, ExecutionStatus, ProfileId, TriggerSource};

use crate::error::{Result, SchedulerError};

/// The job-running seam: `Scheduler` doesn't know how a job's profiles are
/// actually executed, only that it gets back one [`Execution`] per profile.
/// Kept as a trait so tests can substitute a fast fake instead of wiring a
/// real `DbClient`/`Dispatcher` pair. Note `Job.profile_ids` only ever
/// references `Profile` rows (§4.C8 export profiles); `ImportProfile` has
/// no schedule of its own and is triggered directly through the CLI rather
/// than through this producer/consumer loop.
pub trait JobExecutor: Send + Sync {
    fn execute_profile(&self, profile_id: ProfileId, triggered_by: TriggerSource) -> Result<Execution>;

    /// Periodic upkeep unrelated to any one job run: evict stale
    /// notification-throttle entries (§4.C3) and prune retained
    /// delta-sync tombstones (§4.C4). Called by the scheduler on a fixed
    /// tick; the default no-op lets tests substituting a fake executor
    /// ignore it.
    fn housekeeping(&self) {}
}

/// Wires a job's profile ids to [`reef_pipeline::run_profile`], gating each
/// on its dependency graph (§4.C5).
pub struct DefaultExecutor {
    catalog: Arc<dyn CatalogStore>,
    db: Arc<dyn DbClient>,
    destinations: DestinationDispatcher,
    encryptor: Arc<Encryptor>,
    throttle: SyncMutex<NotificationThrottle>,
    reporter_factory: Arc<dyn Fn() -> Box<dyn Reporter> + Send + Sync>,
}

impl DefaultExecutor {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        db: Arc<dyn DbClient>,
        destinations: DestinationDispatcher,
        encryptor: Arc<Encryptor>,
        reporter_factory: Arc<dyn Fn() -> Box<dyn Reporter> + Send + Sync>,
    ) -> Self {
        Self {
            catalog,
            db,
            destinations,
            encryptor,
            throttle: SyncMutex::new(NotificationThrottle::new()),
            reporter_factory,
        }
    }

    /// §4.C5: a profile with unmet prerequisites is skipped rather than run;
    /// the caller surfaces this as `Aborted` so it's distinguishable from an
    /// actual pipeline failure.
    fn dependencies_satisfied(&self, profile_id: ProfileId) -> Result<bool> {
        let dependencies = self.catalog.list_dependencies()?;
        let graph = DependencyGraph::build(&dependencies);
        let (satisfied, _pending) = check_completed(self.catalog.as_ref(), &graph, profile_id)?;
        Ok(satisfied)
    }
}

impl JobExecutor for DefaultExecutor {
    fn execute_profile(&self, profile_id: ProfileId, triggered_by: TriggerSource) -> Result<Execution> {
        let profile = self
            .catalog
            .get_profile(profile_id)?
            .ok_or(SchedulerError::UnknownProfile(profile_id))?;

        if !self.dependencies_satisfied(profile_id)? {
            let mut execution = Execution::new_running(profile_id, triggered_by);
            execution.finish(ExecutionStatus::Aborted, Some("unmet dependencies".into()));
            return Ok(execution);
        }

        let connection = self
            .catalog
            .get_connection(profile.connection_id)?
            .ok_or(SchedulerError::UnknownConnection(profile_id, profile.connection_id))?;
        let destination = self
            .catalog
            .get_destination(profile.destination_id)?
            .ok_or(SchedulerError::UnknownDestination(profile_id))?;

        let inputs = ProfileRunInputs {
            profile: &profile,
            connection: &connection,
            destination: &destination,
            custom_template: None,
            triggered_by,
            default_retry_count: 3,
        };

        let plaintext_connection_string = self
            .encryptor
            .decrypt(&connection.connection_string)
            .map_err(SchedulerError::Decrypt)?;

        let throttle = self.throttle.lock().expect("throttle mutex poisoned");
        let mut reporter = (self.reporter_factory)();
        let execution = reef_pipeline::run_profile(
            self.catalog.as_ref(),
            self.db.as_ref(),
            &self.destinations,
            &throttle,
            &plaintext_connection_string,
            None,
            &inputs,
            reporter.as_mut(),
        );
        Ok(execution)
    }

    fn housekeeping(&self) {
        self.throttle.lock().expect("throttle mutex poisoned").evict_stale();

        let engine = DeltaSyncEngine::new(self.catalog.as_ref());
        let now = Utc::now();

        if let Ok(profiles) = self.catalog.list_profiles() {
            for profile in profiles {
                if profile.delta_sync.enabled && profile.delta_sync.track_deletes {
                    let _ = engine.prune_retention(profile.id, &profile.delta_sync, now);
                }
            }
        }

        if let Ok(import_profiles) = self.catalog.list_import_profiles() {
            for import_profile in import_profiles {
                if import_profile.delta_sync.enabled && import_profile.delta_sync.track_deletes {
                    let profile_id = ProfileId::from(import_profile.id.0);
                    let _ = engine.prune_retention(profile_id, &import_profile.delta_sync, now);
                }
            }
        }
    }
}
