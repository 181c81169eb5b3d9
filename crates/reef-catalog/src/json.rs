use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use reef_types::{
    Connection, ConnectionId, DeltaSyncState, Dependency, DependencyId, Destination,
    DestinationId, Execution, ExecutionId, ImportProfile, ImportProfileId, Job, JobId, Profile,
    ProfileId, WebhookTrigger, WebhookTriggerId,
};

use crate::error::CatalogError;
use crate::memory::InMemoryCatalogStore;
use crate::snapshot::CatalogSnapshot;
use crate::store::CatalogStore;

const CATALOG_FILE_NAME: &str = "catalog.json";

/// A [`CatalogStore`] that mirrors its in-memory snapshot to a single JSON
/// file, writing to a temp path and renaming into place so a reader never
/// observes a half-written catalog.
pub struct JsonFileCatalogStore {
    path: PathBuf,
    inner: InMemoryCatalogStore,
    persist_lock: Mutex<()>,
}

impl JsonFileCatalogStore {
    /// Open the catalog at `dir/catalog.json`, loading it if present or
    /// starting from an empty snapshot otherwise.
    pub fn open(dir: &Path) -> Result<Self, CatalogError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(CATALOG_FILE_NAME);

        let snapshot = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            CatalogSnapshot::default()
        };

        Ok(Self {
            path,
            inner: InMemoryCatalogStore::from_snapshot(snapshot),
            persist_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), CatalogError> {
        let _guard = self.persist_lock.lock().expect("catalog persist lock poisoned");
        let snapshot = self.inner.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

macro_rules! forward_and_persist {
    ($name:ident, $id_ty:ty, $entity_ty:ty) => {
        fn $name(&self, entity: $entity_ty) -> Result<(), CatalogError> {
            self.inner.$name(entity)?;
            self.persist()
        }
    };
}

macro_rules! forward_delete_and_persist {
    ($name:ident, $id_ty:ty) => {
        fn $name(&self, id: $id_ty) -> Result<(), CatalogError> {
            self.inner.$name(id)?;
            self.persist()
        }
    };
}

impl CatalogStore for JsonFileCatalogStore {
    fn get_connection(&self, id: ConnectionId) -> Result<Option<Connection>, CatalogError> {
        self.inner.get_connection(id)
    }
    fn list_connections(&self) -> Result<Vec<Connection>, CatalogError> {
        self.inner.list_connections()
    }
    forward_and_persist!(put_connection, ConnectionId, Connection);
    forward_delete_and_persist!(delete_connection, ConnectionId);

    fn get_destination(&self, id: DestinationId) -> Result<Option<Destination>, CatalogError> {
        self.inner.get_destination(id)
    }
    fn list_destinations(&self) -> Result<Vec<Destination>, CatalogError> {
        self.inner.list_destinations()
    }
    forward_and_persist!(put_destination, DestinationId, Destination);
    forward_delete_and_persist!(delete_destination, DestinationId);

    fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, CatalogError> {
        self.inner.get_profile(id)
    }
    fn list_profiles(&self) -> Result<Vec<Profile>, CatalogError> {
        self.inner.list_profiles()
    }
    forward_and_persist!(put_profile, ProfileId, Profile);
    forward_delete_and_persist!(delete_profile, ProfileId);

    fn get_import_profile(&self, id: ImportProfileId) -> Result<Option<ImportProfile>, CatalogError> {
        self.inner.get_import_profile(id)
    }
    fn list_import_profiles(&self) -> Result<Vec<ImportProfile>, CatalogError> {
        self.inner.list_import_profiles()
    }
    forward_and_persist!(put_import_profile, ImportProfileId, ImportProfile);
    forward_delete_and_persist!(delete_import_profile, ImportProfileId);

    fn get_dependency(&self, id: DependencyId) -> Result<Option<Dependency>, CatalogError> {
        self.inner.get_dependency(id)
    }
    fn list_dependencies(&self) -> Result<Vec<Dependency>, CatalogError> {
        self.inner.list_dependencies()
    }
    forward_and_persist!(put_dependency, DependencyId, Dependency);
    forward_delete_and_persist!(delete_dependency, DependencyId);

    fn get_job(&self, id: JobId) -> Result<Option<Job>, CatalogError> {
        self.inner.get_job(id)
    }
    fn list_jobs(&self) -> Result<Vec<Job>, CatalogError> {
        self.inner.list_jobs()
    }
    forward_and_persist!(put_job, JobId, Job);
    forward_delete_and_persist!(delete_job, JobId);

    fn get_execution(&self, id: ExecutionId) -> Result<Option<Execution>, CatalogError> {
        self.inner.get_execution(id)
    }
    fn list_executions(&self) -> Result<Vec<Execution>, CatalogError> {
        self.inner.list_executions()
    }
    fn list_executions_for_profile(&self, profile_id: ProfileId) -> Result<Vec<Execution>, CatalogError> {
        self.inner.list_executions_for_profile(profile_id)
    }
    forward_and_persist!(put_execution, ExecutionId, Execution);
    forward_delete_and_persist!(delete_execution, ExecutionId);

    fn get_webhook_trigger(&self, id: WebhookTriggerId) -> Result<Option<WebhookTrigger>, CatalogError> {
        self.inner.get_webhook_trigger(id)
    }
    fn list_webhook_triggers(&self) -> Result<Vec<WebhookTrigger>, CatalogError> {
        self.inner.list_webhook_triggers()
    }
    forward_and_persist!(put_webhook_trigger, WebhookTriggerId, WebhookTrigger);
    forward_delete_and_persist!(delete_webhook_trigger, WebhookTriggerId);

    fn get_delta_state(
        &self,
        profile_id: ProfileId,
        reef_id: &str,
    ) -> Result<Option<DeltaSyncState>, CatalogError> {
        self.inner.get_delta_state(profile_id, reef_id)
    }

    fn list_delta_states(&self, profile_id: ProfileId) -> Result<Vec<DeltaSyncState>, CatalogError> {
        self.inner.list_delta_states(profile_id)
    }

    fn put_delta_state(&self, state: DeltaSyncState) -> Result<(), CatalogError> {
        self.inner.put_delta_state(state)?;
        self.persist()
    }

    fn delete_delta_state(&self, profile_id: ProfileId, reef_id: &str) -> Result<(), CatalogError> {
        self.inner.delete_delta_state(profile_id, reef_id)?;
        self.persist()
    }

    fn prune_delta_states(
        &self,
        profile_id: ProfileId,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, CatalogError> {
        let pruned = self.inner.prune_delta_states(profile_id, cutoff)?;
        self.persist()?;
        Ok(pruned)
    }

    fn reset_delta_state(&self, profile_id: ProfileId) -> Result<(), CatalogError> {
        self.inner.reset_delta_state(profile_id)?;
        self.persist()
    }
}
