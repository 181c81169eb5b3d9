//! Profile execution pipeline (§4.C8): query a source connection, classify
//! against delta-sync state, transform/split/deliver the result, then
//! commit and notify. Phases run strictly in sequence and each records its
//! own elapsed time on the returned [`Execution`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use lettre::message::Mailbox;
use reef_catalog::CatalogStore;
use reef_delta::DeltaSyncEngine;
use reef_destinations::Dispatcher as DestinationDispatcher;
use reef_email::{EmailExportRequest, EmailProviderConfig};
use reef_throttle::{cooldowns, NotificationThrottle};
use reef_types::{
    Connection, Destination, Execution, ExecutionStatus, OutputFormat, Profile, Row, SplitRecord, SplitStatus,
    TriggerSource,
};

use crate::db::{query_with_retry, DbClient};
use crate::error::PipelineError;
use crate::filename::{expand, FilenameContext};
use crate::output::{render_csv, render_custom, render_json, render_xml, TransformContext};
use crate::reporter::Reporter;
use crate::split::{batch, group_by_split_key};

/// Inputs threaded through every phase of one profile run. `custom_template`
/// supplies the body for `OutputFormat::Custom`; the template's own storage
/// and lookup by `profile.template_id` is outside this pipeline's scope.
pub struct ProfileRunInputs<'a> {
    pub profile: &'a Profile,
    pub connection: &'a Connection,
    pub destination: &'a Destination,
    pub custom_template: Option<&'a str>,
    pub triggered_by: TriggerSource,
    pub default_retry_count: u32,
}

struct PhaseTimer {
    started: Instant,
    timings: BTreeMap<String, Duration>,
}

impl PhaseTimer {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            timings: BTreeMap::new(),
        }
    }

    fn record(&mut self, phase: &str, since: Instant) {
        self.timings.insert(phase.to_string(), since.elapsed());
        let _ = self.started;
    }
}

/// Runs one profile execution against a decrypted connection string.
/// `connection_string` is expected to already be plaintext (decrypted by
/// the caller via `reef-encrypt` immediately before the call, and dropped
/// immediately after).
#[allow(clippy::too_many_arguments)]
pub fn run_profile(
    catalog: &dyn CatalogStore,
    db: &dyn DbClient,
    destinations: &DestinationDispatcher,
    throttle: &NotificationThrottle,
    connection_string: &str,
    email_from_override: Option<Mailbox>,
    inputs: &ProfileRunInputs,
    reporter: &mut dyn Reporter,
) -> Execution {
    let profile = inputs.profile;
    let mut execution = Execution::new_running(profile.id, inputs.triggered_by);
    let mut timer = PhaseTimer::new();

    reporter.info(&format!("profile {}: starting", profile.code));
    execution.current_phase = Some("initialise".to_string());

    let result = run_phases(catalog, db, destinations, connection_string, email_from_override, inputs, &mut execution, &mut timer, reporter);

    let (status, error_message) = match result {
        Ok(()) => {
            let any_failed = execution.splits.iter().any(|s| s.status == SplitStatus::Failed);
            let any_ok = execution.splits.iter().any(|s| s.status == SplitStatus::Success);
            if execution.splits.is_empty() {
                (ExecutionStatus::Success, None)
            } else if any_failed && any_ok {
                (ExecutionStatus::PartialSuccess, None)
            } else if any_failed {
                (ExecutionStatus::Failed, Some("every split failed to deliver".to_string()))
            } else {
                (ExecutionStatus::Success, None)
            }
        }
        Err(e) => (ExecutionStatus::Failed, Some(e.to_string())),
    };

    execution.finish(status, error_message.clone());
    execution.current_phase = None;
    execution.phase_timings = timer.timings;

    let event_kind = if status == ExecutionStatus::Success { "profile_success" } else { "profile_failure" };
    let cooldown = if status == ExecutionStatus::Success {
        cooldowns::PROFILE_SUCCESS_SECONDS
    } else {
        cooldowns::PROFILE_FAILURE_SECONDS
    };
    if throttle.should_notify(event_kind, &profile.code, cooldown) {
        match &error_message {
            Some(msg) => reporter.error(&format!("profile {}: {status:?} — {msg}", profile.code)),
            None => reporter.info(&format!("profile {}: {status:?}", profile.code)),
        }
    }

    execution
}

#[allow(clippy::too_many_arguments)]
fn run_phases(
    catalog: &dyn CatalogStore,
    db: &dyn DbClient,
    destinations: &DestinationDispatcher,
    connection_string: &str,
    email_from_override: Option<Mailbox>,
    inputs: &ProfileRunInputs,
    execution: &mut Execution,
    timer: &mut PhaseTimer,
    reporter: &mut dyn Reporter,
) -> Result<(), PipelineError> {
    let profile = inputs.profile;

    // Phase 2: pre-process.
    if let Some(pre_process) = &profile.pre_process {
        execution.current_phase = Some("pre_process".to_string());
        let started = Instant::now();
        if let Some(sql) = pre_process.get("sql").and_then(|v| v.as_str()) {
            db.execute(connection_string, sql).map_err(|e| PipelineError::Fatal(e.to_string()))?;
        }
        timer.record("pre_process", started);
    }

    // Phase 3: query, with the §4.C8 transient-error retry.
    execution.current_phase = Some("query".to_string());
    let started = Instant::now();
    let rows = query_with_retry(db, connection_string, &profile.query, inputs.default_retry_count, std::thread::sleep)
        .map_err(|e| PipelineError::Fatal(e.to_string()))?;
    execution.rows_read = rows.len() as u64;
    timer.record("query", started);
    reporter.info(&format!("profile {}: query returned {} rows", profile.code, rows.len()));

    // Phase 4: delta classify.
    execution.current_phase = Some("delta_classify".to_string());
    let started = Instant::now();
    let delta_engine = DeltaSyncEngine::new(catalog);
    let compute_result = if profile.delta_sync.enabled {
        let result = delta_engine.compute(profile.id, &profile.delta_sync, &rows)?;
        execution.rows_skipped += result.classification.unchanged_rows.len() as u64;
        Some(result)
    } else {
        None
    };
    timer.record("delta_classify", started);

    let delivery_rows: Vec<Row> = match &compute_result {
        Some(result) => {
            let keep: std::collections::BTreeSet<&String> =
                result.classification.new_rows.iter().chain(result.classification.changed_rows.iter()).collect();
            rows.iter()
                .filter(|row| match reef_delta::raw_reef_id(row, &profile.delta_sync.reef_id_column) {
                    Some(raw) => {
                        let resolved = reef_delta::normalize_reef_id(&raw, &profile.delta_sync.reef_id_normalization);
                        keep.contains(&resolved)
                    }
                    None => true,
                })
                .cloned()
                .collect()
        }
        None => rows.clone(),
    };

    if profile.is_email_export {
        run_email_export(destinations, connection_string, email_from_override, inputs, execution, timer, reporter, delivery_rows)?;
    } else {
        run_file_export(db, connection_string, destinations, inputs, execution, timer, reporter, delivery_rows)?;
    }

    // Phase 8: commit delta, only after delivery above either raised (this
    // function would already have returned `Err`) or recorded at least one
    // split outcome.
    if let Some(result) = &compute_result {
        let delivered_ok = execution.splits.is_empty() || execution.splits.iter().any(|s| s.status == SplitStatus::Success);
        if delivered_ok {
            execution.current_phase = Some("commit_delta".to_string());
            let started = Instant::now();
            delta_engine.commit(profile.id, &profile.delta_sync, result, execution.id)?;
            timer.record("commit_delta", started);
        }
    }

    // Phase 9: post-process. Already handled per split in `run_file_export`
    // when `split.post_process_per_split` is set, so this single end-of-run
    // call is skipped in that case rather than running post-process twice.
    if let Some(post_process) = &profile.post_process {
        if !profile.is_email_export && profile.split.post_process_per_split {
            // handled per split above
        } else if execution.rows_read == 0 && !profile.on_zero_rows {
            reporter.info(&format!("profile {}: post-process skipped, zero rows", profile.code));
        } else {
            execution.current_phase = Some("post_process".to_string());
            let started = Instant::now();
            if let Some(sql) = post_process.get("sql").and_then(|v| v.as_str()) {
                if let Err(e) = db.execute(connection_string, sql) {
                    let message = format!("profile {}: post-process failed: {e}", profile.code);
                    if profile.rollback_on_failure {
                        reporter.error(&message);
                        for split in execution.splits.iter().filter(|s| s.status == SplitStatus::Success) {
                            if let Some(path) = &split.delivered_path {
                                if let Err(e) =
                                    destinations.compensate(inputs.destination.kind, path, &inputs.destination.configuration)
                                {
                                    reporter.warn(&format!(
                                        "profile {}: rollback failed for split {:?}: {e}",
                                        profile.code, split.split_key
                                    ));
                                }
                            }
                        }
                    } else if profile.skip_on_failure {
                        reporter.warn(&message);
                    } else {
                        timer.record("post_process", started);
                        return Err(PipelineError::Fatal(e.to_string()));
                    }
                }
            }
            timer.record("post_process", started);
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_file_export(
    db: &dyn DbClient,
    connection_string: &str,
    destinations: &DestinationDispatcher,
    inputs: &ProfileRunInputs,
    execution: &mut Execution,
    timer: &mut PhaseTimer,
    reporter: &mut dyn Reporter,
    rows: Vec<Row>,
) -> Result<(), PipelineError> {
    let profile = inputs.profile;
    let now = chrono::Utc::now();
    let format_extension = match profile.output_format {
        OutputFormat::Csv => "csv",
        OutputFormat::Json => "json",
        OutputFormat::Xml => "xml",
        OutputFormat::Excel => "csv",
        OutputFormat::Custom => "txt",
    };

    execution.current_phase = Some("transform".to_string());
    let transform_started = Instant::now();

    let groups = if profile.split.enabled {
        let column = profile.split.split_key_column.as_deref().unwrap_or("unknown");
        group_by_split_key(rows, column)
    } else {
        vec![crate::split::SplitGroup {
            split_key: "unknown".to_string(),
            rows,
        }]
    };
    timer.record("transform", transform_started);

    execution.current_phase = Some("split".to_string());
    let split_started = Instant::now();
    let batch_size = if profile.split.enabled { profile.split.batch_size } else { 0 };

    for group in groups {
        let batches = batch(group.rows, batch_size);
        for rows in batches {
            let row_count = rows.len() as u64;
            let bytes = match profile.output_format {
                OutputFormat::Csv | OutputFormat::Excel => render_csv(&rows)?,
                OutputFormat::Json => render_json(&rows)?,
                OutputFormat::Xml => render_xml(&rows),
                OutputFormat::Custom => {
                    let template = inputs.custom_template.unwrap_or_default();
                    let ctx = TransformContext { profile_name: profile.name.clone(), now };
                    render_custom(&rows, template, &ctx)?
                }
            };

            let filename = expand(
                &profile.split.filename_template,
                &FilenameContext {
                    profile_code: &profile.code,
                    split_key: Some(&group.split_key),
                    now,
                    format_extension,
                },
            );

            let temp_path = write_temp_file(&filename, &bytes)?;
            let outcome = destinations.save(
                inputs.destination.kind,
                &temp_path,
                std::path::Path::new(&filename),
                &inputs.destination.configuration,
            );
            let _ = std::fs::remove_file(&temp_path);

            execution.bytes_processed += bytes.len() as u64;
            if outcome.success {
                execution.rows_inserted += row_count;
            } else {
                execution.rows_failed += row_count;
                reporter.warn(&format!(
                    "profile {}: delivery failed for split {:?}: {:?}",
                    profile.code, group.split_key, outcome.error
                ));
            }

            // §4.C8 phase 6: run post-process per split as soon as that
            // split is delivered, rather than waiting for phase 9's single
            // end-of-run call.
            if outcome.success && profile.split.post_process_per_split {
                if let Some(post_process) = &profile.post_process {
                    if let Some(sql) = post_process.get("sql").and_then(|v| v.as_str()) {
                        if let Err(e) = db.execute(connection_string, sql) {
                            reporter.warn(&format!(
                                "profile {}: per-split post-process failed for split {:?}: {e}",
                                profile.code, group.split_key
                            ));
                        }
                    }
                }
            }

            execution.splits.push(SplitRecord {
                split_key: group.split_key.clone(),
                status: if outcome.success { SplitStatus::Success } else { SplitStatus::Failed },
                row_count,
                completed_at: Some(chrono::Utc::now()),
                delivered_path: if outcome.success { outcome.final_path.clone() } else { None },
                error: outcome.error,
            });
        }
    }
    timer.record("split", split_started);

    execution.current_phase = Some("deliver".to_string());
    Ok(())
}

fn email_provider_from_destination(destination: &Destination) -> Result<EmailProviderConfig, PipelineError> {
    serde_json::from_value(destination.configuration.clone())
        .map_err(|e| PipelineError::Configuration(format!("invalid email destination configuration: {e}")))
}

fn mailbox_from_provider(provider: &EmailProviderConfig) -> Result<Mailbox, PipelineError> {
    let address = match provider {
        EmailProviderConfig::Smtp(c) => &c.from_address,
        EmailProviderConfig::Resend(c) | EmailProviderConfig::SendGrid(c) => &c.from_address,
    };
    address
        .parse()
        .map(|a| Mailbox::new(None, a))
        .map_err(|_| PipelineError::Configuration(format!("invalid from address {address:?}")))
}

#[allow(clippy::too_many_arguments)]
fn run_email_export(
    _destinations: &DestinationDispatcher,
    _connection_string: &str,
    email_from_override: Option<Mailbox>,
    inputs: &ProfileRunInputs,
    execution: &mut Execution,
    timer: &mut PhaseTimer,
    reporter: &mut dyn Reporter,
    rows: Vec<Row>,
) -> Result<(), PipelineError> {
    let profile = inputs.profile;
    let email_config = profile
        .email_export
        .as_ref()
        .ok_or_else(|| PipelineError::Configuration("is_email_export set without email_export config".to_string()))?;

    execution.current_phase = Some("email_export".to_string());
    let started = Instant::now();

    let provider = email_provider_from_destination(inputs.destination)?;
    let from = match email_from_override {
        Some(mailbox) => mailbox,
        None => mailbox_from_provider(&provider)?,
    };

    let request = EmailExportRequest {
        profile_id: profile.id.to_string(),
        profile_name: profile.name.clone(),
        rows,
        split_key_column: profile.split.split_key_column.as_deref(),
        recipients_column: email_config.recipients_column.as_deref(),
        recipients_hardcoded: email_config.recipients_hardcoded.as_deref(),
        cc: email_config.cc.as_deref(),
        subject_hardcoded: email_config.subject.as_deref(),
        subject_column: None,
        body_template: inputs.custom_template.unwrap_or_default(),
        attachment_config: email_config.attachment_config.as_ref().and_then(reef_email::AttachmentConfig::from_json),
        from,
        now: chrono::Utc::now(),
    };

    let records = reef_email::send_export(&request, &provider);
    for record in &records {
        execution.bytes_processed += 0;
        if record.status == SplitStatus::Success {
            execution.rows_inserted += record.row_count;
        } else {
            execution.rows_failed += record.row_count;
            reporter.warn(&format!("profile {}: email split {:?} failed: {:?}", profile.code, record.split_key, record.error));
        }
    }
    execution.splits.extend(records);

    timer.record("email_export", started);
    Ok(())
}

fn write_temp_file(filename: &str, bytes: &[u8]) -> Result<PathBuf, PipelineError> {
    let mut path = std::env::temp_dir();
    path.push(format!("reef-{}-{}", uuid::Uuid::new_v4(), sanitize(filename)));
    std::fs::write(&path, bytes).map_err(|e| PipelineError::Fatal(e.to_string()))?;
    Ok(path)
}

fn sanitize(name: &str) -> String {
    name.chars().map(|c| if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::stub::StubDbClient;
    use crate::reporter::VecReporter;
    use reef_catalog::InMemoryCatalogStore;
    use reef_destinations::Dispatcher as DestinationDispatcher;
    use reef_throttle::NotificationThrottle;
    use reef_types::{
        ColumnValue, ConnectionId, ConnectionKind, DestinationId, DestinationKind, ProfileId, Schedule, SplitConfig,
    };
    use std::collections::BTreeMap;

    fn sample_connection() -> Connection {
        Connection {
            id: ConnectionId::new(),
            name: "warehouse".into(),
            kind: ConnectionKind::PostgreSql,
            connection_string: "PWENC:irrelevant::irrelevant".into(),
            active: true,
            integrity_hash: String::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn sample_destination(base_path: &std::path::Path) -> Destination {
        Destination {
            id: DestinationId::new(),
            name: "local".into(),
            kind: DestinationKind::Local,
            configuration: serde_json::json!({ "basePath": base_path.to_string_lossy() }),
            active: true,
            integrity_hash: String::new(),
        }
    }

    fn sample_profile(code: &str) -> Profile {
        Profile {
            id: ProfileId::new(),
            code: code.into(),
            name: "nightly export".into(),
            connection_id: ConnectionId::new(),
            group_id: None,
            query: "select * from orders".into(),
            schedule: Schedule::Manual,
            output_format: OutputFormat::Csv,
            destination_id: DestinationId::new(),
            template_id: None,
            pre_process: None,
            post_process: None,
            split: SplitConfig {
                enabled: false,
                split_key_column: None,
                filename_template: "{profile}-{splitkey}.{format}".into(),
                batch_size: 1000,
                post_process_per_split: false,
            },
            is_email_export: false,
            email_export: None,
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
            on_zero_rows: false,
            skip_on_failure: false,
            rollback_on_failure: false,
            enabled: true,
            integrity_hash: String::new(),
        }
    }

    fn row(id: i64) -> Row {
        let mut r = BTreeMap::new();
        r.insert("id".to_string(), ColumnValue::Int(id));
        r
    }

    #[test]
    fn successful_run_delivers_a_single_csv_file_and_marks_success() {
        let td = tempfile::tempdir().expect("tempdir");
        let catalog = InMemoryCatalogStore::new();
        let db = StubDbClient::new(vec![Ok(vec![row(1), row(2)])]);
        let destinations = DestinationDispatcher::default();
        let throttle = NotificationThrottle::new();
        let connection = sample_connection();
        let destination = sample_destination(td.path());
        let profile = sample_profile("P-0001");
        let inputs = ProfileRunInputs {
            profile: &profile,
            connection: &connection,
            destination: &destination,
            custom_template: None,
            triggered_by: TriggerSource::Manual,
            default_retry_count: 2,
        };
        let mut reporter = VecReporter::default();

        let execution = run_profile(&catalog, &db, &destinations, &throttle, "cs", None, &inputs, &mut reporter);

        assert_eq!(execution.status, ExecutionStatus::Success);
        assert_eq!(execution.rows_read, 2);
        assert_eq!(execution.rows_inserted, 2);
        assert_eq!(execution.splits.len(), 1);
        assert!(execution.phase_timings.contains_key("query"));
    }

    #[test]
    fn delivery_failure_to_a_missing_base_path_marks_execution_failed() {
        let catalog = InMemoryCatalogStore::new();
        let db = StubDbClient::new(vec![Ok(vec![row(1)])]);
        let destinations = DestinationDispatcher::default();
        let throttle = NotificationThrottle::new();
        let connection = sample_connection();
        let bogus = std::path::PathBuf::from("/nonexistent-reef-test-path/definitely-not-a-dir");
        let destination = sample_destination(&bogus);
        let profile = sample_profile("P-0002");
        let inputs = ProfileRunInputs {
            profile: &profile,
            connection: &connection,
            destination: &destination,
            custom_template: None,
            triggered_by: TriggerSource::Manual,
            default_retry_count: 0,
        };
        let mut reporter = VecReporter::default();

        let execution = run_profile(&catalog, &db, &destinations, &throttle, "cs", None, &inputs, &mut reporter);

        assert_eq!(execution.status, ExecutionStatus::Failed);
        assert_eq!(execution.rows_failed, 1);
    }

    #[test]
    fn post_process_is_skipped_on_zero_rows_when_on_zero_rows_is_off() {
        let td = tempfile::tempdir().expect("tempdir");
        let catalog = InMemoryCatalogStore::new();
        let db = StubDbClient::new(vec![Ok(vec![])]);
        let destinations = DestinationDispatcher::default();
        let throttle = NotificationThrottle::new();
        let connection = sample_connection();
        let destination = sample_destination(td.path());
        let mut profile = sample_profile("P-0003");
        profile.post_process = Some(serde_json::json!({ "sql": "update stats set last_run = now()" }));
        let inputs = ProfileRunInputs {
            profile: &profile,
            connection: &connection,
            destination: &destination,
            custom_template: None,
            triggered_by: TriggerSource::Manual,
            default_retry_count: 0,
        };
        let mut reporter = VecReporter::default();

        let execution = run_profile(&catalog, &db, &destinations, &throttle, "cs", None, &inputs, &mut reporter);

        assert_eq!(execution.status, ExecutionStatus::Success);
        assert!(!execution.phase_timings.contains_key("post_process"));
        assert!(!db.calls.lock().unwrap().iter().any(|sql| sql.contains("last_run")));
    }

    /// A [`DbClient`] whose `execute` fails whenever the statement contains
    /// `fail_marker`, used to exercise post-process failure handling.
    struct FailOnMarkerDb {
        inner: StubDbClient,
        fail_marker: &'static str,
    }

    impl DbClient for FailOnMarkerDb {
        fn query(&self, connection_string: &str, sql: &str) -> Result<Vec<Row>, crate::db::DbError> {
            self.inner.query(connection_string, sql)
        }

        fn execute(&self, connection_string: &str, sql: &str) -> Result<u64, crate::db::DbError> {
            if sql.contains(self.fail_marker) {
                return Err(crate::db::DbError::Connection("post-process boom".into()));
            }
            self.inner.execute(connection_string, sql)
        }

        fn probe_schema(&self, connection_string: &str, table: &str) -> Result<Vec<String>, crate::db::DbError> {
            self.inner.probe_schema(connection_string, table)
        }
    }

    #[test]
    fn rollback_on_failure_calls_compensate_on_every_delivered_split() {
        let td = tempfile::tempdir().expect("tempdir");
        let catalog = InMemoryCatalogStore::new();
        let db = FailOnMarkerDb {
            inner: StubDbClient::new(vec![Ok(vec![row(1)])]),
            fail_marker: "boom_marker",
        };
        let destinations = DestinationDispatcher::default();
        let throttle = NotificationThrottle::new();
        let connection = sample_connection();
        let destination = sample_destination(td.path());
        let mut profile = sample_profile("P-0004");
        profile.post_process = Some(serde_json::json!({ "sql": "call boom_marker()" }));
        profile.rollback_on_failure = true;
        let inputs = ProfileRunInputs {
            profile: &profile,
            connection: &connection,
            destination: &destination,
            custom_template: None,
            triggered_by: TriggerSource::Manual,
            default_retry_count: 0,
        };
        let mut reporter = VecReporter::default();

        let execution = run_profile(&catalog, &db, &destinations, &throttle, "cs", None, &inputs, &mut reporter);

        assert_eq!(execution.splits.len(), 1);
        let delivered_path = execution.splits[0].delivered_path.clone().expect("delivered path recorded");
        assert!(!std::path::Path::new(&delivered_path).exists(), "compensate should have deleted the delivered file");
        assert!(reporter.lines.iter().any(|(level, msg)| *level == "error" && msg.contains("post-process failed")));
    }

    #[test]
    fn skip_on_failure_logs_a_warning_and_keeps_delivered_files() {
        let td = tempfile::tempdir().expect("tempdir");
        let catalog = InMemoryCatalogStore::new();
        let db = FailOnMarkerDb {
            inner: StubDbClient::new(vec![Ok(vec![row(1)])]),
            fail_marker: "boom_marker",
        };
        let destinations = DestinationDispatcher::default();
        let throttle = NotificationThrottle::new();
        let connection = sample_connection();
        let destination = sample_destination(td.path());
        let mut profile = sample_profile("P-0005");
        profile.post_process = Some(serde_json::json!({ "sql": "call boom_marker()" }));
        profile.skip_on_failure = true;
        let inputs = ProfileRunInputs {
            profile: &profile,
            connection: &connection,
            destination: &destination,
            custom_template: None,
            triggered_by: TriggerSource::Manual,
            default_retry_count: 0,
        };
        let mut reporter = VecReporter::default();

        let execution = run_profile(&catalog, &db, &destinations, &throttle, "cs", None, &inputs, &mut reporter);

        let delivered_path = execution.splits[0].delivered_path.clone().expect("delivered path recorded");
        assert!(std::path::Path::new(&delivered_path).exists(), "skip_on_failure must not roll back delivery");
        assert!(reporter.lines.iter().any(|(level, msg)| *level == "warn" && msg.contains("post-process failed")));
    }

    #[test]
    fn post_process_per_split_runs_once_per_delivered_file() {
        let td = tempfile::tempdir().expect("tempdir");
        let catalog = InMemoryCatalogStore::new();
        let db = StubDbClient::new(vec![Ok(vec![row(1), row(2)])]);
        let destinations = DestinationDispatcher::default();
        let throttle = NotificationThrottle::new();
        let connection = sample_connection();
        let destination = sample_destination(td.path());
        let mut profile = sample_profile("P-0006");
        profile.split.enabled = true;
        profile.split.split_key_column = Some("id".to_string());
        profile.split.post_process_per_split = true;
        profile.post_process = Some(serde_json::json!({ "sql": "per_split_marker" }));
        let inputs = ProfileRunInputs {
            profile: &profile,
            connection: &connection,
            destination: &destination,
            custom_template: None,
            triggered_by: TriggerSource::Manual,
            default_retry_count: 0,
        };
        let mut reporter = VecReporter::default();

        let execution = run_profile(&catalog, &db, &destinations, &throttle, "cs", None, &inputs, &mut reporter);

        assert_eq!(execution.splits.len(), 2);
        let marker_calls = db.calls.lock().unwrap().iter().filter(|sql| sql.contains("per_split_marker")).count();
        assert_eq!(marker_calls, 2);
    }
}
