//! # Reef
//!
//! A scheduled data-movement platform: export query results or database
//! tables to files and remote destinations, import files into databases, on
//! a schedule or on demand, with delta sync, dependency ordering, and
//! encrypted-at-rest connection secrets.
//!
//! ## Pipeline
//!
//! 1. [`catalog`] holds profiles, connections, destinations, jobs and their
//!    execution history behind the [`catalog::CatalogStore`] trait.
//! 2. [`pipeline::run_profile`] executes one export: query or extract,
//!    transform, split, deliver to one or more destinations, optionally
//!    email the result.
//! 3. [`pipeline::run_import`] executes one import: fetch a source file,
//!    parse it, load it into a target table or local file.
//! 4. [`scheduler::Scheduler`] polls the catalog for due [`types::Job`]s and
//!    runs them with bounded concurrency, respecting [`deps`] ordering.
//!
//! ## Modules
//!
//! - [`types`] — domain entities shared across every component
//! - [`config`] — layered `reef.toml` + environment + CLI configuration
//! - [`duration`] — humantime/millisecond duration (de)serialization
//! - [`retry`] — retry policy presets and backoff calculation
//! - [`encrypt`] — envelope encryption for connection/destination secrets
//! - [`hash`] — row tamper-evidence hashing
//! - [`throttle`] — per-event-kind notification cooldown
//! - [`catalog`] — the `CatalogStore` trait and its in-memory/JSON-file backends
//! - [`deps`] — profile dependency graph and cycle/readiness checks
//! - [`delta`] — incremental sync state tracking
//! - [`destinations`] — destination backends (local, FTP/SFTP, S3, Azure, HTTP, ...)
//! - [`sources`] — source fetchers for import profiles
//! - [`email`] — templated notification emails
//! - [`pipeline`] — profile/import execution orchestration
//! - [`scheduler`] — the bounded-concurrency job scheduler

pub use reef_catalog as catalog;
pub use reef_delta as delta;
pub use reef_deps as deps;
pub use reef_destinations as destinations;
pub use reef_duration as duration;
pub use reef_email as email;
pub use reef_encrypt as encrypt;
pub use reef_hash as hash;
pub use reef_pipeline as pipeline;
pub use reef_retry as retry;
pub use reef_scheduler as scheduler;
pub use reef_sources as sources;
pub use reef_throttle as throttle;
pub use reef_types as types;

pub use reef_config as config;
