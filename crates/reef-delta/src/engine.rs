use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rand::Rng;
use reef_catalog::CatalogStore;
use reef_types::{
    DeltaSyncConfig, DeltaSyncState, DuplicateStrategy, ExecutionId, NullStrategy, ProfileId, Row,
};

use crate::canonical::{normalize_reef_id, raw_reef_id, row_hash, schema_fingerprint};
use crate::classify::{classify, Classification};
use crate::error::DeltaError;

/// Sentinel execution id `generate_baseline` commits rows against, standing
/// in for the "no execution yet" `0` the spec describes.
pub const BASELINE_EXECUTION_ID: ExecutionId = ExecutionId(uuid::Uuid::nil());

/// Sentinel `ReefId` the schema fingerprint is stored under, in the same
/// per-profile delta-state keyspace as real rows.
const SCHEMA_FINGERPRINT_KEY: &str = "__schema_fingerprint__";

/// Result of classifying one run's rows against previously committed state.
/// `current` is the full `reef_id -> row_hash` map for this run; it is what
/// [`DeltaSyncEngine::commit`] persists once delivery succeeds.
#[derive(Debug, Clone)]
pub struct ComputeResult {
    pub current: BTreeMap<String, String>,
    pub classification: Classification,
    pub schema_fingerprint: String,
    /// Set when `reset_on_schema_change` was on and a prior run's schema
    /// fingerprint differed from this run's, so `compute` already reset
    /// the profile's tracked state before classifying.
    pub schema_reset: bool,
}

/// The delta-sync engine (§4.C4): elides unchanged rows and tracks
/// deletions across runs for one profile at a time.
pub struct DeltaSyncEngine<'a> {
    catalog: &'a dyn CatalogStore,
}

impl<'a> DeltaSyncEngine<'a> {
    pub fn new(catalog: &'a dyn CatalogStore) -> Self {
        Self { catalog }
    }

    /// Classify `rows` against the profile's previously committed state.
    /// Aside from the `reset_on_schema_change` pre-run check, nothing is
    /// written to the catalog until [`Self::commit`] is called after the
    /// delivery step succeeds.
    pub fn compute(
        &self,
        profile_id: ProfileId,
        config: &DeltaSyncConfig,
        rows: &[Row],
    ) -> Result<ComputeResult, DeltaError> {
        let fingerprint = schema_fingerprint(rows);
        let mut schema_reset = false;

        if config.reset_on_schema_change {
            if let Some(stored) = self.catalog.get_delta_state(profile_id, SCHEMA_FINGERPRINT_KEY)? {
                if stored.row_hash != fingerprint {
                    self.reset_all(profile_id)?;
                    schema_reset = true;
                }
            }
        }

        let previous: BTreeMap<String, String> = self
            .catalog
            .list_delta_states(profile_id)?
            .into_iter()
            .filter(|state| !state.is_deleted && state.reef_id != SCHEMA_FINGERPRINT_KEY)
            .map(|state| (state.reef_id, state.row_hash))
            .collect();

        let mut current: BTreeMap<String, String> = BTreeMap::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();

        for row in rows {
            let resolved = match raw_reef_id(row, &config.reef_id_column) {
                Some(raw) => normalize_reef_id(&raw, &config.reef_id_normalization),
                None => match config.null_strategy {
                    NullStrategy::Strict => {
                        return Err(DeltaError::NullReefId(config.reef_id_column.clone()))
                    }
                    NullStrategy::Skip => continue,
                    NullStrategy::Generate => generated_reef_id(),
                },
            };

            if seen.contains(&resolved) {
                match config.duplicate_strategy {
                    DuplicateStrategy::Strict => {
                        return Err(DeltaError::DuplicateReefId(resolved))
                    }
                    DuplicateStrategy::Skip => continue,
                }
            }
            seen.insert(resolved.clone());

            let hash = row_hash(row, &resolved, config);
            current.insert(resolved, hash);
        }

        let classification = classify(&previous, &current);
        Ok(ComputeResult {
            current,
            classification,
            schema_fingerprint: fingerprint,
            schema_reset,
        })
    }

    /// Persist a [`ComputeResult`] after the delivery step reports success.
    /// Upserts every current key and, if `track_deletes`, flips deleted
    /// rows' `is_deleted`.
    pub fn commit(
        &self,
        profile_id: ProfileId,
        config: &DeltaSyncConfig,
        result: &ComputeResult,
        execution_id: ExecutionId,
    ) -> Result<(), DeltaError> {
        for (reef_id, hash) in &result.current {
            let mut state = self
                .catalog
                .get_delta_state(profile_id, reef_id)?
                .unwrap_or_else(|| {
                    DeltaSyncState::first_seen(
                        profile_id,
                        reef_id.clone(),
                        hash.clone(),
                        execution_id,
                    )
                });
            state.touch(hash.clone(), execution_id);
            self.catalog.put_delta_state(state)?;
        }

        if config.track_deletes {
            for reef_id in &result.classification.deleted_reef_ids {
                if let Some(mut state) = self.catalog.get_delta_state(profile_id, reef_id)? {
                    state.mark_deleted();
                    self.catalog.put_delta_state(state)?;
                }
            }
        }

        if config.reset_on_schema_change {
            let mut fingerprint_state = self
                .catalog
                .get_delta_state(profile_id, SCHEMA_FINGERPRINT_KEY)?
                .unwrap_or_else(|| {
                    DeltaSyncState::first_seen(
                        profile_id,
                        SCHEMA_FINGERPRINT_KEY.to_string(),
                        result.schema_fingerprint.clone(),
                        execution_id,
                    )
                });
            fingerprint_state.touch(result.schema_fingerprint.clone(), execution_id);
            self.catalog.put_delta_state(fingerprint_state)?;
        }

        Ok(())
    }

    /// Delete all tracked state for a profile.
    pub fn reset_all(&self, profile_id: ProfileId) -> Result<(), DeltaError> {
        Ok(self.catalog.reset_delta_state(profile_id)?)
    }

    /// Delete tracked state for specific `ReefId`s only.
    pub fn reset_rows(&self, profile_id: ProfileId, reef_ids: &[String]) -> Result<(), DeltaError> {
        for reef_id in reef_ids {
            self.catalog.delete_delta_state(profile_id, reef_id)?;
        }
        Ok(())
    }

    /// Clear state and seed it from `rows` as if they were the first run,
    /// committed against [`BASELINE_EXECUTION_ID`].
    pub fn generate_baseline(
        &self,
        profile_id: ProfileId,
        config: &DeltaSyncConfig,
        rows: &[Row],
    ) -> Result<(), DeltaError> {
        self.reset_all(profile_id)?;
        let result = self.compute(profile_id, config, rows)?;
        self.commit(profile_id, config, &result, BASELINE_EXECUTION_ID)
    }

    /// Delete rows marked deleted before `retention_days` ago. Intended to
    /// be run by a periodic task.
    pub fn prune_retention(
        &self,
        profile_id: ProfileId,
        config: &DeltaSyncConfig,
        now: DateTime<Utc>,
    ) -> Result<u64, DeltaError> {
        let cutoff = now - chrono::Duration::days(config.retention_days);
        Ok(self.catalog.prune_delta_states(profile_id, cutoff)?)
    }
}

fn generated_reef_id() -> String {
    let suffix: u64 = rand::rng().random();
    format!("GENERATED_{suffix:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reef_catalog::InMemoryCatalogStore;
    use reef_types::ColumnValue;

    fn row(name: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), ColumnValue::Text(name.into()));
        row.insert("value".into(), ColumnValue::Int(1));
        row
    }

    fn config() -> DeltaSyncConfig {
        DeltaSyncConfig {
            enabled: true,
            reef_id_column: "id".into(),
            track_deletes: true,
            ..Default::default()
        }
    }

    #[test]
    fn first_run_classifies_everything_as_new() {
        let catalog = InMemoryCatalogStore::new();
        let engine = DeltaSyncEngine::new(&catalog);
        let profile_id = ProfileId::new();
        let config = config();

        let result = engine.compute(profile_id, &config, &[row("a"), row("b")]).unwrap();
        assert_eq!(result.classification.new_rows.len(), 2);
        assert!(result.classification.changed_rows.is_empty());
    }

    #[test]
    fn uncommitted_runs_are_not_persisted() {
        let catalog = InMemoryCatalogStore::new();
        let engine = DeltaSyncEngine::new(&catalog);
        let profile_id = ProfileId::new();
        let config = config();

        engine.compute(profile_id, &config, &[row("a")]).unwrap();
        assert!(catalog.list_delta_states(profile_id).unwrap().is_empty());
    }

    #[test]
    fn second_run_sees_unchanged_then_deleted_rows() {
        let catalog = InMemoryCatalogStore::new();
        let engine = DeltaSyncEngine::new(&catalog);
        let profile_id = ProfileId::new();
        let config = config();
        let execution_id = ExecutionId::new();

        let first = engine.compute(profile_id, &config, &[row("a"), row("b")]).unwrap();
        engine.commit(profile_id, &config, &first, execution_id).unwrap();

        let second = engine.compute(profile_id, &config, &[row("a")]).unwrap();
        assert_eq!(second.classification.unchanged_rows, vec!["a".to_string()]);
        assert_eq!(second.classification.deleted_reef_ids, vec!["b".to_string()]);

        engine.commit(profile_id, &config, &second, ExecutionId::new()).unwrap();
        let b_state = catalog.get_delta_state(profile_id, "b").unwrap().unwrap();
        assert!(b_state.is_deleted);
    }

    #[test]
    fn null_reef_id_is_strict_by_default() {
        let catalog = InMemoryCatalogStore::new();
        let engine = DeltaSyncEngine::new(&catalog);
        let profile_id = ProfileId::new();
        let config = config();

        let mut bad_row = Row::new();
        bad_row.insert("id".into(), ColumnValue::Null);

        let result = engine.compute(profile_id, &config, &[bad_row]);
        assert!(matches!(result, Err(DeltaError::NullReefId(_))));
    }

    #[test]
    fn schema_change_resets_state_when_flag_is_set() {
        let catalog = InMemoryCatalogStore::new();
        let engine = DeltaSyncEngine::new(&catalog);
        let profile_id = ProfileId::new();
        let config = DeltaSyncConfig {
            reset_on_schema_change: true,
            ..config()
        };

        let first = engine.compute(profile_id, &config, &[row("a"), row("b")]).unwrap();
        assert!(!first.schema_reset);
        engine.commit(profile_id, &config, &first, ExecutionId::new()).unwrap();

        let mut reshaped = row("a");
        reshaped.insert("new_column".into(), ColumnValue::Int(1));
        let second = engine.compute(profile_id, &config, &[reshaped]).unwrap();

        assert!(second.schema_reset);
        assert_eq!(second.classification.new_rows.len(), 1);
        assert!(second.classification.deleted_reef_ids.is_empty());
    }

    #[test]
    fn schema_change_is_ignored_when_flag_is_unset() {
        let catalog = InMemoryCatalogStore::new();
        let engine = DeltaSyncEngine::new(&catalog);
        let profile_id = ProfileId::new();
        let config = config();

        let first = engine.compute(profile_id, &config, &[row("a")]).unwrap();
        engine.commit(profile_id, &config, &first, ExecutionId::new()).unwrap();

        let mut reshaped = row("a");
        reshaped.insert("new_column".into(), ColumnValue::Int(1));
        let second = engine.compute(profile_id, &config, &[reshaped]).unwrap();

        assert!(!second.schema_reset);
        assert_eq!(second.classification.changed_rows, vec!["a".to_string()]);
    }

    #[test]
    fn generate_baseline_seeds_state_against_sentinel_execution() {
        let catalog = InMemoryCatalogStore::new();
        let engine = DeltaSyncEngine::new(&catalog);
        let profile_id = ProfileId::new();
        let config = config();

        engine
            .generate_baseline(profile_id, &config, &[row("a")])
            .unwrap();

        let state = catalog.get_delta_state(profile_id, "a").unwrap().unwrap();
        assert_eq!(state.last_seen_execution_id, BASELINE_EXECUTION_ID);
    }
}
