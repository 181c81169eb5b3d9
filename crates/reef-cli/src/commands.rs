use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use reef_catalog::CatalogStore;
use reef_config::Config;
use reef_pipeline::{ImportRunInputs, ProfileRunInputs, Reporter as _};
use reef_throttle::NotificationThrottle;
use reef_types::{ConnectionId, Execution, JobId, ProfileId, TriggerSource};
use uuid::Uuid;

use crate::null_db::NullDbClient;
use crate::reporter::CliReporter;
use crate::wiring;

pub fn parse_profile_id(raw: &str) -> Result<ProfileId> {
    Ok(ProfileId::from(Uuid::parse_str(raw).context("invalid profile id")?))
}

pub fn parse_job_id(raw: &str) -> Result<JobId> {
    Ok(JobId::from(Uuid::parse_str(raw).context("invalid job id")?))
}

pub fn parse_import_profile_id(raw: &str) -> Result<reef_types::ImportProfileId> {
    Ok(reef_types::ImportProfileId::from(Uuid::parse_str(raw).context("invalid import profile id")?))
}

pub fn profile_list(config: &Config, dir: &Path) -> Result<()> {
    let catalog = wiring::build_catalog(config, dir)?;
    let mut profiles = catalog.list_profiles()?;
    profiles.sort_by(|a, b| a.code.cmp(&b.code));
    for profile in profiles {
        println!(
            "{}  {}  {}  enabled={}",
            profile.id, profile.code, profile.name, profile.enabled
        );
    }
    Ok(())
}

pub fn profile_show(config: &Config, dir: &Path, id: ProfileId) -> Result<()> {
    let catalog = wiring::build_catalog(config, dir)?;
    let profile = catalog.get_profile(id)?.context("profile not found")?;
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

pub fn profile_run(config: &Config, dir: &Path, id: ProfileId) -> Result<()> {
    let catalog = wiring::build_catalog(config, dir)?;
    let profile = catalog.get_profile(id)?.context("profile not found")?;
    let connection = catalog.get_connection(profile.connection_id)?.context("connection not found")?;
    let destination = catalog.get_destination(profile.destination_id)?.context("destination not found")?;

    let encryptor = wiring::build_encryptor(dir)?;
    let plaintext_connection_string = encryptor.decrypt(&connection.connection_string)?;
    let dispatcher = wiring::build_dispatcher(config);
    let throttle = NotificationThrottle::new();
    let db = NullDbClient;
    let mut reporter = CliReporter;

    let inputs = ProfileRunInputs {
        profile: &profile,
        connection: &connection,
        destination: &destination,
        custom_template: None,
        triggered_by: TriggerSource::Manual,
        default_retry_count: 3,
    };

    let execution = reef_pipeline::run_profile(
        catalog.as_ref(),
        &db,
        &dispatcher,
        &throttle,
        &plaintext_connection_string,
        None,
        &inputs,
        &mut reporter,
    );
    print_execution(&execution);
    catalog.put_execution(execution)?;
    Ok(())
}

pub fn import_run(config: &Config, dir: &Path, id: reef_types::ImportProfileId) -> Result<()> {
    let catalog = wiring::build_catalog(config, dir)?;
    let import_profile = catalog.get_import_profile(id)?.context("import profile not found")?;
    let sources = reef_sources::Dispatcher;
    let db = NullDbClient;
    let mut reporter = CliReporter;

    let target_connection_string = match import_profile.target_connection_id {
        Some(connection_id) => Some(resolve_plaintext_connection(catalog.as_ref(), dir, connection_id)?),
        None => None,
    };

    let inputs = ImportRunInputs {
        import_profile: &import_profile,
        triggered_by: TriggerSource::Manual,
    };

    let execution = reef_pipeline::run_import(
        catalog.as_ref(),
        &db,
        &sources,
        target_connection_string.as_deref(),
        &inputs,
        &mut reporter,
    );
    print_execution(&execution);
    catalog.put_execution(execution)?;
    Ok(())
}

fn resolve_plaintext_connection(catalog: &dyn CatalogStore, dir: &Path, connection_id: ConnectionId) -> Result<String> {
    let connection = catalog.get_connection(connection_id)?.context("connection not found")?;
    let encryptor = wiring::build_encryptor(dir)?;
    Ok(encryptor.decrypt(&connection.connection_string)?)
}

pub fn job_list(config: &Config, dir: &Path) -> Result<()> {
    let catalog = wiring::build_catalog(config, dir)?;
    let mut jobs = catalog.list_jobs()?;
    jobs.sort_by(|a, b| a.name.cmp(&b.name));
    for job in jobs {
        println!(
            "{}  {}  priority={}  enabled={}  next_run={}  failures={}",
            job.id, job.name, job.priority, job.is_enabled, job.next_run_time, job.consecutive_failures
        );
    }
    Ok(())
}

pub fn job_show(config: &Config, dir: &Path, id: JobId) -> Result<()> {
    let catalog = wiring::build_catalog(config, dir)?;
    let job = catalog.get_job(id)?.context("job not found")?;
    println!("{}", serde_json::to_string_pretty(&job)?);
    Ok(())
}

pub fn job_set_enabled(config: &Config, dir: &Path, id: JobId, enabled: bool) -> Result<()> {
    let catalog = wiring::build_catalog(config, dir)?;
    let mut job = catalog.get_job(id)?.context("job not found")?;
    job.is_enabled = enabled;
    if enabled {
        job.next_run_time = job.next_run_time.max(Utc::now());
    }
    catalog.put_job(job)?;
    Ok(())
}

pub fn config_show(config: &Config) -> Result<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

pub fn config_init(dir: &Path) -> Result<()> {
    let config = Config::new();
    reef_config::save_config(dir, &config)?;
    println!("wrote {}", reef_config::config_path(dir).display());
    Ok(())
}

pub fn doctor(config: &Config, dir: &Path) -> Result<()> {
    let mut reporter = CliReporter;
    match wiring::build_catalog(config, dir) {
        Ok(catalog) => {
            let count = catalog.list_profiles().map(|p| p.len()).unwrap_or(0);
            reporter.info(&format!("catalog reachable at {} ({count} profiles)", dir.display()));
        }
        Err(e) => reporter.warn(&format!("catalog unreachable: {e:#}")),
    }
    match wiring::build_encryptor(dir) {
        Ok(_) => reporter.info("encryption key store opened"),
        Err(e) => reporter.warn(&format!("encryption key store unreadable: {e:#}")),
    }
    reporter.info(&format!(
        "scheduler: {} worker(s), poll every {:?}",
        config.scheduler.worker_count, config.scheduler.poll_interval
    ));
    Ok(())
}

fn print_execution(execution: &Execution) {
    println!(
        "execution {} status={:?} rows_read={} rows_inserted={} rows_updated={}",
        execution.id, execution.status, execution.rows_read, execution.rows_inserted, execution.rows_updated
    );
    if let Some(error) = &execution.error_message {
        println!("error: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reef_config::{CatalogBackend, CatalogConfig};
    use reef_types::{DeltaSyncConfig, Job, JobId, OutputFormat, Schedule, SplitConfig};
    use tempfile::tempdir;

    fn json_file_config() -> Config {
        Config { catalog: CatalogConfig { backend: CatalogBackend::JsonFile, path: None }, ..Config::default() }
    }

    fn sample_job(name: &str) -> Job {
        Job {
            id: JobId::new(),
            name: name.into(),
            profile_ids: vec![ProfileId::new()],
            priority: 0,
            allow_concurrent: false,
            timeout_minutes: 30,
            max_retries: 3,
            consecutive_failures: 0,
            next_run_time: Utc::now() - chrono::Duration::hours(1),
            is_enabled: false,
        }
    }

    #[test]
    fn config_init_then_show_round_trips() {
        let dir = tempdir().expect("tempdir");
        config_init(dir.path()).expect("init");
        let loaded = reef_config::load_config(dir.path()).expect("load");
        config_show(&loaded).expect("show");
        assert_eq!(loaded.scheduler.worker_count, Config::new().scheduler.worker_count);
    }

    #[test]
    fn job_enable_persists_across_catalog_reopen() {
        let dir = tempdir().expect("tempdir");
        let config = json_file_config();
        let job = sample_job("nightly-export");
        let job_id = job.id;

        {
            let catalog = wiring::build_catalog(&config, dir.path()).expect("open catalog");
            catalog.put_job(job).expect("put job");
        }

        job_set_enabled(&config, dir.path(), job_id, true).expect("enable");

        let catalog = wiring::build_catalog(&config, dir.path()).expect("reopen catalog");
        let stored = catalog.get_job(job_id).expect("get job").expect("present");
        assert!(stored.is_enabled);
        assert!(stored.next_run_time >= Utc::now() - chrono::Duration::seconds(5));
    }

    #[test]
    fn job_list_and_show_see_catalog_contents() {
        let dir = tempdir().expect("tempdir");
        let config = json_file_config();
        let job = sample_job("weekly-import");
        let job_id = job.id;

        let catalog = wiring::build_catalog(&config, dir.path()).expect("open catalog");
        catalog.put_job(job).expect("put job");
        drop(catalog);

        job_list(&config, dir.path()).expect("list");
        job_show(&config, dir.path(), job_id).expect("show");
    }

    #[test]
    fn parse_profile_id_rejects_malformed_uuid() {
        assert!(parse_profile_id("not-a-uuid").is_err());
    }

    #[test]
    fn profile_round_trips_through_json_file_catalog() {
        let dir = tempdir().expect("tempdir");
        let config = json_file_config();

        let profile = reef_types::Profile {
            id: ProfileId::new(),
            code: "P-0001".into(),
            name: "nightly export".into(),
            connection_id: reef_types::ConnectionId::new(),
            group_id: None,
            query: "select 1".into(),
            schedule: Schedule::Manual,
            output_format: OutputFormat::Csv,
            destination_id: reef_types::DestinationId::new(),
            template_id: None,
            pre_process: None,
            post_process: None,
            split: SplitConfig {
                enabled: false,
                split_key_column: None,
                filename_template: "{ProfileName}".into(),
                batch_size: 1000,
                post_process_per_split: false,
            },
            is_email_export: false,
            email_export: None,
            delta_sync: DeltaSyncConfig::default(),
            on_zero_rows: false,
            skip_on_failure: false,
            rollback_on_failure: false,
            enabled: true,
            integrity_hash: String::new(),
        };
        let profile_id = profile.id;

        let catalog = wiring::build_catalog(&config, dir.path()).expect("open catalog");
        catalog.put_profile(profile).expect("put profile");
        drop(catalog);

        profile_list(&config, dir.path()).expect("list");
        profile_show(&config, dir.path(), profile_id).expect("show");
    }
}
