//! Import execution pipeline (§4.C9): fetch one or more source files,
//! parse and map their rows, classify against delta-sync state, and load
//! the result into a database table or a local file.

use std::time::Instant;

use reef_catalog::CatalogStore;
use reef_delta::DeltaSyncEngine;
use reef_sources::Dispatcher as SourceDispatcher;
use reef_types::{
    ColumnValue, Execution, ExecutionStatus, FailureAction, ImportProfile, LoadStrategy, ProfileId, Row,
    RowFailureAction, SourceFormat, TriggerSource,
};

use crate::db::{execute_with_retry, DbClient};
use crate::error::PipelineError;
use crate::ingest::{map_row, parse_csv, parse_fixed_width, parse_json, parse_xml};
use crate::output::render_csv;
use crate::reporter::Reporter;

pub struct ImportRunInputs<'a> {
    pub import_profile: &'a ImportProfile,
    pub triggered_by: TriggerSource,
}

fn delta_profile_id(import_profile: &ImportProfile) -> ProfileId {
    ProfileId::from(import_profile.id.0)
}

/// Runs one import execution. `target_connection_string` is required (and
/// must already be plaintext) when `target_kind` is `Database`; it is
/// ignored for `LocalFile` targets.
pub fn run_import(
    catalog: &dyn CatalogStore,
    db: &dyn DbClient,
    sources: &SourceDispatcher,
    target_connection_string: Option<&str>,
    inputs: &ImportRunInputs,
    reporter: &mut dyn Reporter,
) -> Execution {
    let profile = inputs.import_profile;
    let mut execution = Execution::new_running(delta_profile_id(profile), inputs.triggered_by);

    reporter.info(&format!("import {}: starting", profile.code));

    let result = run_phases(catalog, db, sources, target_connection_string, inputs, &mut execution, reporter);

    let (status, error_message) = match result {
        Ok(()) if execution.rows_failed > 0 && execution.rows_inserted == 0 && execution.rows_updated == 0 => {
            (ExecutionStatus::Failed, Some("every row failed mapping or load".to_string()))
        }
        Ok(()) if execution.rows_failed > 0 => (ExecutionStatus::PartialSuccess, None),
        Ok(()) => (ExecutionStatus::Success, None),
        Err(e) => (ExecutionStatus::Failed, Some(e.to_string())),
    };

    execution.finish(status, error_message);
    execution.current_phase = None;
    execution
}

fn run_phases(
    catalog: &dyn CatalogStore,
    db: &dyn DbClient,
    sources: &SourceDispatcher,
    target_connection_string: Option<&str>,
    inputs: &ImportRunInputs,
    execution: &mut Execution,
    reporter: &mut dyn Reporter,
) -> Result<(), PipelineError> {
    let profile = inputs.import_profile;

    // Phase: fetch.
    execution.current_phase = Some("fetch".to_string());
    let started = Instant::now();
    let items = sources
        .fetch(
            profile.source_kind,
            &profile.source_configuration,
            &profile.file_pattern,
            profile.selection_rule,
            profile.failure_policy.retry_count,
            profile.failure_policy.on_source_failure,
        )
        .map_err(|e| PipelineError::Source(e.to_string()))?;
    execution.phase_timings.insert("fetch".to_string(), started.elapsed());
    reporter.info(&format!("import {}: fetched {} item(s)", profile.code, items.len()));

    if items.is_empty() {
        return Ok(());
    }

    // Phase: parse + map.
    execution.current_phase = Some("parse_map".to_string());
    let started = Instant::now();
    let mut mapped_rows: Vec<Row> = Vec::new();
    let mut fetched_identifiers = Vec::new();

    for item in &items {
        fetched_identifiers.push(item.identifier.clone());
        let raw_records = match profile.source_format {
            SourceFormat::Csv => parse_csv(&item.content_bytes),
            SourceFormat::Json => parse_json(&item.content_bytes),
            SourceFormat::Xml => parse_xml(&item.content_bytes, &profile.format_configuration),
            SourceFormat::FixedWidth => parse_fixed_width(&item.content_bytes, &profile.format_configuration),
        };

        let raw_records = match raw_records {
            Ok(records) => records,
            Err(e) if profile.failure_policy.on_parse_failure == FailureAction::Skip => {
                reporter.warn(&format!("import {}: skipping {} — parse failed: {e}", profile.code, item.identifier));
                continue;
            }
            Err(e) => return Err(e),
        };

        for raw in &raw_records {
            execution.rows_read += 1;
            match map_row(raw, &profile.column_mappings) {
                Ok(row) => mapped_rows.push(row),
                Err(e) => {
                    execution.rows_failed += 1;
                    match profile.failure_policy.on_row_failure {
                        RowFailureAction::Fail => {
                            return Err(PipelineError::Row(format!("{}: {}", e.column, e.message)));
                        }
                        RowFailureAction::Skip | RowFailureAction::Continue => {
                            reporter.warn(&format!("import {}: row dropped — {}", profile.code, e.message));
                        }
                    }
                }
            }

            if should_abort(&profile.failure_policy, execution.rows_failed, execution.rows_read) {
                return Err(PipelineError::Row(format!(
                    "{} failed rows exceeded the configured abort threshold",
                    execution.rows_failed
                )));
            }
        }
    }
    execution.phase_timings.insert("parse_map".to_string(), started.elapsed());

    // Phase: delta classify.
    execution.current_phase = Some("delta_classify".to_string());
    let started = Instant::now();
    let delta_engine = DeltaSyncEngine::new(catalog);
    let compute_result = if profile.delta_sync.enabled {
        let result = delta_engine.compute(delta_profile_id(profile), &profile.delta_sync, &mapped_rows)?;
        execution.rows_skipped += result.classification.unchanged_rows.len() as u64;
        Some(result)
    } else {
        None
    };
    execution.phase_timings.insert("delta_classify".to_string(), started.elapsed());

    let load_rows: Vec<Row> = match &compute_result {
        Some(result) => {
            let keep: std::collections::BTreeSet<&String> =
                result.classification.new_rows.iter().chain(result.classification.changed_rows.iter()).collect();
            mapped_rows
                .into_iter()
                .filter(|row| match reef_delta::raw_reef_id(row, &profile.delta_sync.reef_id_column) {
                    Some(raw) => {
                        let resolved = reef_delta::normalize_reef_id(&raw, &profile.delta_sync.reef_id_normalization);
                        keep.contains(&resolved)
                    }
                    None => true,
                })
                .collect()
        }
        None => mapped_rows,
    };

    // Phase: load.
    execution.current_phase = Some("load".to_string());
    let started = Instant::now();
    load_target(db, target_connection_string, profile, &load_rows, execution)?;
    execution.phase_timings.insert("load".to_string(), started.elapsed());

    // Phase: commit delta, only once the load above has not raised.
    if let Some(result) = compute_result {
        execution.current_phase = Some("commit_delta".to_string());
        let started = Instant::now();
        delta_engine.commit(delta_profile_id(profile), &profile.delta_sync, &result, execution.id)?;
        execution.phase_timings.insert("commit_delta".to_string(), started.elapsed());
    }

    // Phase: archive.
    if profile.archive_after_import {
        execution.current_phase = Some("archive".to_string());
        let started = Instant::now();
        for identifier in &fetched_identifiers {
            if let Err(e) = sources.archive(profile.source_kind, &profile.source_configuration, identifier) {
                reporter.warn(&format!("import {}: failed to archive {identifier}: {e}", profile.code));
            }
        }
        execution.phase_timings.insert("archive".to_string(), started.elapsed());
    }

    Ok(())
}

fn should_abort(policy: &reef_types::FailurePolicy, rows_failed: u64, rows_read: u64) -> bool {
    if let Some(max) = policy.max_failed_rows_before_abort {
        if rows_failed >= max {
            return true;
        }
    }
    if let Some(percent) = policy.max_failed_rows_percent {
        if rows_read > 0 && (rows_failed as f64 / rows_read as f64) * 100.0 >= percent {
            return true;
        }
    }
    false
}

fn load_target(
    db: &dyn DbClient,
    target_connection_string: Option<&str>,
    profile: &ImportProfile,
    rows: &[Row],
    execution: &mut Execution,
) -> Result<(), PipelineError> {
    match profile.target_kind {
        reef_types::ImportTargetKind::LocalFile => {
            let path = profile
                .target_local_path
                .as_deref()
                .ok_or_else(|| PipelineError::Configuration("target_kind LocalFile requires target_local_path".to_string()))?;
            let bytes = render_csv(rows)?;
            std::fs::write(path, bytes).map_err(|e| PipelineError::Fatal(e.to_string()))?;
            execution.rows_inserted += rows.len() as u64;
            Ok(())
        }
        reef_types::ImportTargetKind::Database => {
            let connection_string = target_connection_string
                .ok_or_else(|| PipelineError::Configuration("target_kind Database requires a target connection".to_string()))?;
            let table = profile
                .target_table
                .as_deref()
                .ok_or_else(|| PipelineError::Configuration("target_kind Database requires target_table".to_string()))?;

            if profile.load_strategy == LoadStrategy::FullReplace && profile.failure_policy.rollback_on_abort {
                // §4.C9 phase 8: truncate + inserts run as one transaction
                // so a mid-load failure leaves the target table untouched
                // rather than truncated with a partial load.
                let mut statements = Vec::with_capacity(rows.len() + 1);
                statements.push(format!("DELETE FROM {table}"));
                statements.extend(rows.iter().map(|row| insert_sql(table, row)));
                crate::db::execute_transaction_with_retry(
                    db,
                    connection_string,
                    &statements,
                    profile.failure_policy.retry_count,
                    std::thread::sleep,
                )
                .map_err(|e| PipelineError::Fatal(e.to_string()))?;
                execution.rows_inserted += rows.len() as u64;
                return Ok(());
            }

            if profile.load_strategy == LoadStrategy::FullReplace {
                execute_with_retry(db, connection_string, &format!("DELETE FROM {table}"), profile.failure_policy.retry_count, std::thread::sleep)
                    .map_err(|e| PipelineError::Fatal(e.to_string()))?;
            }

            for row in rows {
                let sql = match profile.load_strategy {
                    LoadStrategy::Insert | LoadStrategy::FullReplace | LoadStrategy::Append => insert_sql(table, row),
                    LoadStrategy::Upsert => upsert_sql(table, row, &profile.upsert_key_columns),
                };
                execute_with_retry(db, connection_string, &sql, profile.failure_policy.retry_count, std::thread::sleep)
                    .map_err(|e| PipelineError::Fatal(e.to_string()))?;
                execution.rows_inserted += 1;
            }
            Ok(())
        }
    }
}

fn sql_literal(value: &ColumnValue) -> String {
    match value {
        ColumnValue::Null => "NULL".to_string(),
        ColumnValue::Bool(b) => b.to_string(),
        ColumnValue::Int(i) => i.to_string(),
        ColumnValue::Float(f) => f.to_string(),
        ColumnValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        ColumnValue::Bytes(b) => format!("'{}'", hex::encode(b)),
        ColumnValue::Timestamp(t) => format!("'{}'", t.to_rfc3339()),
    }
}

fn insert_sql(table: &str, row: &Row) -> String {
    let columns: Vec<&String> = row.keys().collect();
    let values: Vec<String> = columns.iter().map(|c| sql_literal(&row[*c])).collect();
    let column_list = columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ");
    format!("INSERT INTO {table} ({column_list}) VALUES ({})", values.join(", "))
}

/// A portable `INSERT ... ON CONFLICT` form. The three supported drivers
/// disagree on upsert syntax (`MERGE` for SQL Server, `ON DUPLICATE KEY
/// UPDATE` for MySQL); translating this into each dialect is left to the
/// concrete `DbClient` implementation, not this crate.
fn upsert_sql(table: &str, row: &Row, key_columns: &[String]) -> String {
    let columns: Vec<&String> = row.keys().collect();
    let values: Vec<String> = columns.iter().map(|c| sql_literal(&row[*c])).collect();
    let column_list = columns.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", ");
    let conflict = if key_columns.is_empty() { columns.first().map(|c| c.as_str()).unwrap_or("id") } else { key_columns[0].as_str() };
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !key_columns.contains(c))
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    format!(
        "INSERT INTO {table} ({column_list}) VALUES ({}) ON CONFLICT ({conflict}) DO UPDATE SET {}",
        values.join(", "),
        updates.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::stub::StubDbClient;
    use crate::reporter::VecReporter;
    use reef_catalog::InMemoryCatalogStore;
    use reef_types::{ColumnMapping, FailurePolicy, ImportProfileId, SelectionRule};
    use std::fs;
    use tempfile::tempdir;

    fn sample_import_profile(source_base: &std::path::Path, target_path: &std::path::Path) -> ImportProfile {
        ImportProfile {
            id: ImportProfileId::new(),
            code: "I-0001".into(),
            name: "nightly orders import".into(),
            source_kind: reef_types::DestinationKind::Local,
            source_configuration: serde_json::json!({ "basePath": source_base.to_string_lossy() }),
            file_pattern: "*.csv".into(),
            selection_rule: SelectionRule::All,
            archive_after_import: false,
            source_format: SourceFormat::Csv,
            format_configuration: serde_json::json!({}),
            column_mappings: vec![
                ColumnMapping { source: "id".into(), target: "id".into(), datatype: "int".into(), default: None, skip_on_null: false, is_key: true },
                ColumnMapping { source: "name".into(), target: "name".into(), datatype: "text".into(), default: None, skip_on_null: false, is_key: false },
            ],
            target_kind: reef_types::ImportTargetKind::LocalFile,
            target_connection_id: None,
            target_table: None,
            target_local_path: Some(target_path.to_string_lossy().into_owned()),
            load_strategy: LoadStrategy::Append,
            upsert_key_columns: Vec::new(),
            batch_size: 1000,
            failure_policy: FailurePolicy::default(),
            delta_sync: reef_types::DeltaSyncConfig {
                enabled: false,
                reef_id_column: "id".to_string(),
                hash_algorithm: Default::default(),
                duplicate_strategy: Default::default(),
                null_strategy: Default::default(),
                numeric_precision: 6,
                reef_id_normalization: Vec::new(),
                remove_non_printable: false,
                track_deletes: false,
                retention_days: 90,
                reset_on_schema_change: false,
            },
            enabled: true,
            integrity_hash: String::new(),
        }
    }

    #[test]
    fn imports_a_csv_file_into_a_local_file_target() {
        let source_dir = tempdir().expect("tempdir");
        let target_dir = tempdir().expect("tempdir");
        fs::write(source_dir.path().join("orders.csv"), "id,name\n1,alice\n2,bob\n").expect("write source");

        let target_path = target_dir.path().join("out.csv");
        let profile = sample_import_profile(source_dir.path(), &target_path);
        let catalog = InMemoryCatalogStore::new();
        let db = StubDbClient::new(vec![]);
        let sources = SourceDispatcher;
        let inputs = ImportRunInputs { import_profile: &profile, triggered_by: TriggerSource::Manual };
        let mut reporter = VecReporter::default();

        let execution = run_import(&catalog, &db, &sources, None, &inputs, &mut reporter);

        assert_eq!(execution.status, ExecutionStatus::Success);
        assert_eq!(execution.rows_read, 2);
        assert_eq!(execution.rows_inserted, 2);
        assert!(target_path.exists());
    }

    #[test]
    fn fail_row_policy_aborts_on_first_mapping_error() {
        let source_dir = tempdir().expect("tempdir");
        let target_dir = tempdir().expect("tempdir");
        fs::write(source_dir.path().join("orders.csv"), "id,name\nnot-a-number,alice\n").expect("write source");

        let target_path = target_dir.path().join("out.csv");
        let profile = sample_import_profile(source_dir.path(), &target_path);
        let catalog = InMemoryCatalogStore::new();
        let db = StubDbClient::new(vec![]);
        let sources = SourceDispatcher;
        let inputs = ImportRunInputs { import_profile: &profile, triggered_by: TriggerSource::Manual };
        let mut reporter = VecReporter::default();

        let execution = run_import(&catalog, &db, &sources, None, &inputs, &mut reporter);

        assert_eq!(execution.status, ExecutionStatus::Failed);
    }
}
