mod commands;
mod null_db;
mod reporter;
mod wiring;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use commands::{parse_import_profile_id, parse_job_id, parse_profile_id};
use reporter::CliReporter;

#[derive(Parser, Debug)]
#[command(name = "reef", version)]
#[command(about = "Scheduled data-movement platform: profile/import pipelines and their scheduler")]
struct Cli {
    /// Directory holding the JSON-file catalog, key store and config.
    /// Defaults to `.reef` in the current directory.
    #[arg(long, global = true)]
    catalog_dir: Option<PathBuf>,

    /// Path to a `reef.toml` config file. Defaults to walking up from the
    /// current directory for one, then built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export profile operations.
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
    /// Import profile operations.
    Import {
        #[command(subcommand)]
        action: ImportCommands,
    },
    /// Scheduled job operations.
    Job {
        #[command(subcommand)]
        action: JobCommands,
    },
    /// Run the bounded-concurrency job scheduler until interrupted.
    Scheduler {
        /// Override the configured worker count.
        #[arg(long)]
        workers: Option<u32>,
        /// Override the configured poll interval, in seconds.
        #[arg(long)]
        interval: Option<u32>,
    },
    /// Configuration operations.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
    /// Print environment diagnostics.
    Doctor,
    /// Print a shell completion script to stdout.
    Completions { shell: Shell },
}

#[derive(Subcommand, Debug)]
enum ProfileCommands {
    /// List every profile in the catalog.
    List,
    /// Print one profile as JSON.
    Show { id: String },
    /// Run one profile immediately, outside the scheduler.
    Run { id: String },
}

#[derive(Subcommand, Debug)]
enum ImportCommands {
    /// Run one import profile immediately.
    Run { id: String },
}

#[derive(Subcommand, Debug)]
enum JobCommands {
    /// List every job in the catalog.
    List,
    /// Print one job as JSON.
    Show { id: String },
    /// Enable a job, scheduling it for its next due run.
    Enable { id: String },
    /// Disable a job; the scheduler will no longer pick it up.
    Disable { id: String },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the resolved configuration (file + environment layers).
    Show,
    /// Write a `reef.toml` with built-in defaults to the catalog directory.
    Init,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.cmd {
        clap_complete::generate(shell, &mut Cli::command(), "reef", &mut std::io::stdout());
        return Ok(());
    }

    let start_dir = std::env::current_dir().context("reading current directory")?;
    let config = match &cli.config {
        Some(path) => reef_config::load_config_from_file(path)?,
        None => reef_config::resolve_config(&start_dir)?,
    };
    let dir = wiring::catalog_dir(&config, cli.catalog_dir.as_deref());

    match cli.cmd {
        Commands::Profile { action } => match action {
            ProfileCommands::List => commands::profile_list(&config, &dir)?,
            ProfileCommands::Show { id } => commands::profile_show(&config, &dir, parse_profile_id(&id)?)?,
            ProfileCommands::Run { id } => commands::profile_run(&config, &dir, parse_profile_id(&id)?)?,
        },
        Commands::Import { action } => match action {
            ImportCommands::Run { id } => commands::import_run(&config, &dir, parse_import_profile_id(&id)?)?,
        },
        Commands::Job { action } => match action {
            JobCommands::List => commands::job_list(&config, &dir)?,
            JobCommands::Show { id } => commands::job_show(&config, &dir, parse_job_id(&id)?)?,
            JobCommands::Enable { id } => commands::job_set_enabled(&config, &dir, parse_job_id(&id)?, true)?,
            JobCommands::Disable { id } => commands::job_set_enabled(&config, &dir, parse_job_id(&id)?, false)?,
        },
        Commands::Scheduler { workers, interval } => run_scheduler(&config, &dir, workers, interval).await?,
        Commands::Config { action } => match action {
            ConfigCommands::Show => commands::config_show(&config)?,
            ConfigCommands::Init => commands::config_init(&dir)?,
        },
        Commands::Doctor => commands::doctor(&config, &dir)?,
    }

    Ok(())
}

async fn run_scheduler(config: &reef_config::Config, dir: &std::path::Path, workers: Option<u32>, interval: Option<u32>) -> Result<()> {
    let catalog = wiring::build_catalog(config, dir)?;
    let encryptor = wiring::build_encryptor(dir)?;
    let dispatcher = wiring::build_dispatcher(config);
    let db = Arc::new(null_db::NullDbClient);

    let executor = Arc::new(reef_scheduler::DefaultExecutor::new(
        catalog.clone(),
        db,
        dispatcher,
        encryptor,
        Arc::new(|| Box::new(CliReporter) as Box<dyn reef_pipeline::Reporter>),
    ));

    let max_concurrent_jobs = workers.unwrap_or(config.scheduler.worker_count as u32);
    let check_interval_seconds = interval.unwrap_or(config.scheduler.poll_interval.as_secs() as u32);
    let scheduler_config = reef_scheduler::SchedulerConfig::new(max_concurrent_jobs, check_interval_seconds);

    let scheduler = Arc::new(reef_scheduler::Scheduler::new(catalog, executor, scheduler_config));
    scheduler.repair_stale_schedules()?;

    eprintln!("[info] scheduler starting, ctrl-c to stop");
    let run_handle = tokio::spawn(scheduler.clone().run());
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    eprintln!("[info] shutting down");
    scheduler.shutdown();
    let _ = run_handle.await;
    Ok(())
}
