//! Configuration file handling for reef (§10 "Configuration").
//!
//! Reads `reef.toml`, discovered by walking up from the working directory,
//! merges it with `REEF_*` environment overrides and finally with whatever
//! a caller (typically `reef-cli`) built from its own flags. Precedence is
//! CLI > env > file > built-in defaults, each layer's `merge` only
//! overriding a field the layer actually set.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reef_retry::{RetryPolicy, RetryStrategyConfig};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "reef.toml";

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Complete reef configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `other` over `self`; every field `other` set explicitly
    /// (i.e. differs from its type's own default) wins.
    pub fn merge(&self, other: &Config) -> Config {
        Config {
            catalog: CatalogConfig {
                backend: if other.catalog.backend != CatalogBackend::default() { other.catalog.backend } else { self.catalog.backend },
                path: other.catalog.path.clone().or_else(|| self.catalog.path.clone()),
            },
            scheduler: SchedulerConfig {
                worker_count: if other.scheduler.worker_count != default_worker_count() {
                    other.scheduler.worker_count
                } else {
                    self.scheduler.worker_count
                },
                poll_interval: if other.scheduler.poll_interval != default_poll_interval() {
                    other.scheduler.poll_interval
                } else {
                    self.scheduler.poll_interval
                },
                default_priority: if other.scheduler.default_priority != default_priority() {
                    other.scheduler.default_priority
                } else {
                    self.scheduler.default_priority
                },
            },
            retry: RetryConfig {
                policy: other.retry.policy,
                custom: other.retry.custom.clone().or_else(|| self.retry.custom.clone()),
            },
            encryption: EncryptionConfig {
                key_env_var: if other.encryption.key_env_var != default_key_env_var() {
                    other.encryption.key_env_var.clone()
                } else {
                    self.encryption.key_env_var.clone()
                },
            },
        }
    }

    /// Apply `REEF_*` environment overrides on top of `self` (§10).
    pub fn with_env_overrides(&self) -> Config {
        let mut config = self.clone();

        if let Ok(path) = env::var("REEF_CATALOG_PATH") {
            config.catalog.path = Some(PathBuf::from(path));
        }
        if let Ok(backend) = env::var("REEF_CATALOG_BACKEND") {
            if let Some(parsed) = CatalogBackend::parse(&backend) {
                config.catalog.backend = parsed;
            }
        }
        if let Ok(workers) = env::var("REEF_SCHEDULER_WORKERS") {
            if let Ok(n) = workers.parse() {
                config.scheduler.worker_count = n;
            }
        }
        if let Ok(interval) = env::var("REEF_SCHEDULER_POLL_INTERVAL") {
            if let Ok(d) = reef_duration::parse_seconds_or_humantime(&interval) {
                config.scheduler.poll_interval = d;
            }
        }
        if let Ok(key_env_var) = env::var("REEF_ENCRYPTION_KEY_ENV") {
            config.encryption.key_env_var = key_env_var;
        }

        config
    }

    pub fn retry_strategy(&self) -> RetryStrategyConfig {
        self.retry.custom.clone().unwrap_or_else(|| self.retry.policy.to_config())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogBackend {
    #[default]
    Memory,
    JsonFile,
}

impl CatalogBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "memory" => Some(CatalogBackend::Memory),
            "json_file" | "json-file" | "jsonfile" => Some(CatalogBackend::JsonFile),
            _ => None,
        }
    }
}

/// Which [`reef_catalog::CatalogStore`] implementation to construct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub backend: CatalogBackend,
    /// Required when `backend` is `json_file`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_worker_count() -> usize {
    4
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_priority() -> i32 {
    0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(
        default = "default_poll_interval",
        serialize_with = "reef_duration::serialize_duration",
        deserialize_with = "reef_duration::deserialize_duration"
    )]
    pub poll_interval: Duration,
    #[serde(default = "default_priority")]
    pub default_priority: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            poll_interval: default_poll_interval(),
            default_priority: default_priority(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub policy: RetryPolicy,
    /// Overrides `policy` entirely when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<RetryStrategyConfig>,
}

fn default_key_env_var() -> String {
    "REEF_ENCRYPTION_KEY".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Name of the environment variable `reef-encrypt` reads its master
    /// key from.
    #[serde(default = "default_key_env_var")]
    pub key_env_var: String,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self { key_env_var: default_key_env_var() }
    }
}

/// Load configuration from `dir/reef.toml`, or defaults if absent.
pub fn load_config(dir: &Path) -> Result<Config> {
    let path = config_path(dir);
    if !path.exists() {
        return Ok(Config::default());
    }
    load_config_from_file(&path)
}

pub fn load_config_from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content).with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config)
}

pub fn save_config(dir: &Path, config: &Config) -> Result<()> {
    let path = config_path(dir);
    let content = toml::to_string_pretty(config).context("failed to serialize config to TOML")?;
    std::fs::write(&path, content).with_context(|| format!("failed to write config file: {}", path.display()))?;
    Ok(())
}

/// Walk up from `start_dir` looking for `reef.toml`.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;
    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

/// Discover and fully resolve configuration: file (if found by walking up
/// from `start_dir`) merged with environment overrides.
pub fn resolve_config(start_dir: &Path) -> Result<Config> {
    let file_config = match find_config(start_dir) {
        Some(path) => load_config_from_file(&path)?,
        None => Config::default(),
    };
    Ok(file_config.with_env_overrides())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let td = tempdir().expect("tempdir");
        let config = load_config(td.path()).expect("load");
        assert_eq!(config.scheduler.worker_count, 4);
        assert_eq!(config.catalog.backend, CatalogBackend::Memory);
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let td = tempdir().expect("tempdir");
        let mut config = Config::default();
        config.scheduler.worker_count = 8;
        config.catalog.backend = CatalogBackend::JsonFile;
        config.catalog.path = Some(td.path().join("catalog.json"));

        save_config(td.path(), &config).expect("save");
        let loaded = load_config(td.path()).expect("load");
        assert_eq!(loaded.scheduler.worker_count, 8);
        assert_eq!(loaded.catalog.backend, CatalogBackend::JsonFile);
    }

    #[test]
    fn find_config_walks_up_parent_directories() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join(CONFIG_FILE), "").expect("write");
        let nested = td.path().join("a").join("b");
        fs::create_dir_all(&nested).expect("mkdir");

        let found = find_config(&nested).expect("found");
        assert_eq!(found, config_path(td.path()));
    }

    #[test]
    #[serial]
    fn env_override_wins_over_file_value() {
        let mut config = Config::default();
        config.scheduler.worker_count = 2;

        let overridden = temp_env::with_var("REEF_SCHEDULER_WORKERS", Some("16"), || config.with_env_overrides());
        assert_eq!(overridden.scheduler.worker_count, 16);
    }

    #[test]
    fn merge_prefers_explicitly_set_other_fields() {
        let base = Config::default();
        let mut override_config = Config::default();
        override_config.scheduler.worker_count = 12;

        let merged = base.merge(&override_config);
        assert_eq!(merged.scheduler.worker_count, 12);
        assert_eq!(merged.scheduler.poll_interval, base.scheduler.poll_interval);
    }
}
