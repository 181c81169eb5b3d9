use std::sync::Mutex;

use chrono::{DateTime, Utc};
use reef_types::{
    Connection, ConnectionId, DeltaSyncState, Dependency, DependencyId, Destination,
    DestinationId, Execution, ExecutionId, ImportProfile, ImportProfileId, Job, JobId, Profile,
    ProfileId, WebhookTrigger, WebhookTriggerId,
};

use crate::error::CatalogError;
use crate::snapshot::{delta_key, CatalogSnapshot};
use crate::store::CatalogStore;

/// A [`CatalogStore`] that keeps everything in a [`Mutex`]-guarded
/// [`CatalogSnapshot`] and never touches disk. Used by tests and anywhere a
/// throwaway catalog is wanted.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    snapshot: Mutex<CatalogSnapshot>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    pub(crate) fn snapshot(&self) -> CatalogSnapshot {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogSnapshot> {
        self.snapshot.lock().expect("catalog snapshot lock poisoned")
    }
}

macro_rules! table_crud {
    ($get:ident, $list:ident, $put:ident, $delete:ident, $table:ident, $id_ty:ty, $entity_ty:ty) => {
        fn $get(&self, id: $id_ty) -> Result<Option<$entity_ty>, CatalogError> {
            Ok(self.lock().$table.get(&id.to_string()).cloned())
        }

        fn $list(&self) -> Result<Vec<$entity_ty>, CatalogError> {
            Ok(self.lock().$table.values().cloned().collect())
        }

        fn $put(&self, entity: $entity_ty) -> Result<(), CatalogError> {
            self.lock().$table.insert(entity.id.to_string(), entity);
            Ok(())
        }

        fn $delete(&self, id: $id_ty) -> Result<(), CatalogError> {
            self.lock().$table.remove(&id.to_string());
            Ok(())
        }
    };
}

impl CatalogStore for InMemoryCatalogStore {
    table_crud!(
        get_connection,
        list_connections,
        put_connection,
        delete_connection,
        connections,
        ConnectionId,
        Connection
    );
    table_crud!(
        get_destination,
        list_destinations,
        put_destination,
        delete_destination,
        destinations,
        DestinationId,
        Destination
    );
    table_crud!(
        get_profile,
        list_profiles,
        put_profile,
        delete_profile,
        profiles,
        ProfileId,
        Profile
    );
    table_crud!(
        get_import_profile,
        list_import_profiles,
        put_import_profile,
        delete_import_profile,
        import_profiles,
        ImportProfileId,
        ImportProfile
    );
    table_crud!(
        get_dependency,
        list_dependencies,
        put_dependency,
        delete_dependency,
        dependencies,
        DependencyId,
        Dependency
    );
    table_crud!(get_job, list_jobs, put_job, delete_job, jobs, JobId, Job);
    table_crud!(
        get_execution,
        list_executions,
        put_execution,
        delete_execution,
        executions,
        ExecutionId,
        Execution
    );
    table_crud!(
        get_webhook_trigger,
        list_webhook_triggers,
        put_webhook_trigger,
        delete_webhook_trigger,
        webhook_triggers,
        WebhookTriggerId,
        WebhookTrigger
    );

    fn list_executions_for_profile(
        &self,
        profile_id: ProfileId,
    ) -> Result<Vec<Execution>, CatalogError> {
        let mut executions: Vec<Execution> = self
            .lock()
            .executions
            .values()
            .filter(|e| e.profile_id == profile_id)
            .cloned()
            .collect();
        executions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(executions)
    }

    fn get_delta_state(
        &self,
        profile_id: ProfileId,
        reef_id: &str,
    ) -> Result<Option<DeltaSyncState>, CatalogError> {
        Ok(self
            .lock()
            .delta_states
            .get(&delta_key(profile_id, reef_id))
            .cloned())
    }

    fn list_delta_states(&self, profile_id: ProfileId) -> Result<Vec<DeltaSyncState>, CatalogError> {
        Ok(self
            .lock()
            .delta_states
            .values()
            .filter(|s| s.profile_id == profile_id)
            .cloned()
            .collect())
    }

    fn put_delta_state(&self, state: DeltaSyncState) -> Result<(), CatalogError> {
        let key = delta_key(state.profile_id, &state.reef_id);
        self.lock().delta_states.insert(key, state);
        Ok(())
    }

    fn delete_delta_state(&self, profile_id: ProfileId, reef_id: &str) -> Result<(), CatalogError> {
        self.lock().delta_states.remove(&delta_key(profile_id, reef_id));
        Ok(())
    }

    fn prune_delta_states(
        &self,
        profile_id: ProfileId,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, CatalogError> {
        let mut snapshot = self.lock();
        let before = snapshot.delta_states.len();
        snapshot.delta_states.retain(|_, state| {
            !(state.profile_id == profile_id
                && state.is_deleted
                && state.deleted_at.map(|at| at < cutoff).unwrap_or(false))
        });
        Ok((before - snapshot.delta_states.len()) as u64)
    }

    fn reset_delta_state(&self, profile_id: ProfileId) -> Result<(), CatalogError> {
        self.lock()
            .delta_states
            .retain(|_, state| state.profile_id != profile_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reef_types::ConnectionKind;

    fn sample_connection() -> Connection {
        Connection {
            id: ConnectionId::new(),
            name: "test".into(),
            kind: ConnectionKind::SqlServer,
            connection_string: "PWENC: x :: y".into(),
            active: true,
            integrity_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = InMemoryCatalogStore::new();
        let connection = sample_connection();
        store.put_connection(connection.clone()).unwrap();

        let fetched = store.get_connection(connection.id).unwrap().unwrap();
        assert_eq!(fetched.name, "test");
    }

    #[test]
    fn delete_removes_entity() {
        let store = InMemoryCatalogStore::new();
        let connection = sample_connection();
        store.put_connection(connection.clone()).unwrap();
        store.delete_connection(connection.id).unwrap();
        assert!(store.get_connection(connection.id).unwrap().is_none());
    }

    #[test]
    fn delta_state_is_scoped_by_profile() {
        let store = InMemoryCatalogStore::new();
        let profile_a = ProfileId::new();
        let profile_b = ProfileId::new();
        let execution = ExecutionId::new();

        store
            .put_delta_state(DeltaSyncState::first_seen(
                profile_a,
                "1".into(),
                "hash-a".into(),
                execution,
            ))
            .unwrap();
        store
            .put_delta_state(DeltaSyncState::first_seen(
                profile_b,
                "1".into(),
                "hash-b".into(),
                execution,
            ))
            .unwrap();

        assert_eq!(store.list_delta_states(profile_a).unwrap().len(), 1);
        assert_eq!(store.list_delta_states(profile_b).unwrap().len(), 1);

        let fetched = store.get_delta_state(profile_a, "1").unwrap().unwrap();
        assert_eq!(fetched.row_hash, "hash-a");
    }

    #[test]
    fn reset_delta_state_only_clears_target_profile() {
        let store = InMemoryCatalogStore::new();
        let profile_a = ProfileId::new();
        let profile_b = ProfileId::new();
        let execution = ExecutionId::new();

        store
            .put_delta_state(DeltaSyncState::first_seen(
                profile_a,
                "1".into(),
                "hash".into(),
                execution,
            ))
            .unwrap();
        store
            .put_delta_state(DeltaSyncState::first_seen(
                profile_b,
                "1".into(),
                "hash".into(),
                execution,
            ))
            .unwrap();

        store.reset_delta_state(profile_a).unwrap();
        assert!(store.list_delta_states(profile_a).unwrap().is_empty());
        assert_eq!(store.list_delta_states(profile_b).unwrap().len(), 1);
    }
}
