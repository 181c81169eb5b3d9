//! Turns a loaded [`reef_config::Config`] into the trait objects the rest
//! of the CLI operates on: a catalog store, an encryptor, a destination
//! dispatcher.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use reef_catalog::{CatalogStore, InMemoryCatalogStore, JsonFileCatalogStore};
use reef_config::{CatalogBackend, Config};
use reef_destinations::Dispatcher as DestinationDispatcher;
use reef_encrypt::{load_master_secret, Encryptor};

/// Default directory the JSON-file catalog and key material live under
/// when neither `--catalog-dir` nor `catalog.path` names one.
pub const DEFAULT_CATALOG_DIR: &str = ".reef";

pub fn catalog_dir(config: &Config, override_dir: Option<&Path>) -> PathBuf {
    override_dir
        .map(Path::to_path_buf)
        .or_else(|| config.catalog.path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_DIR))
}

pub fn build_catalog(config: &Config, dir: &Path) -> Result<Arc<dyn CatalogStore>> {
    let store: Arc<dyn CatalogStore> = match config.catalog.backend {
        CatalogBackend::Memory => Arc::new(InMemoryCatalogStore::new()),
        CatalogBackend::JsonFile => {
            Arc::new(JsonFileCatalogStore::open(dir).with_context(|| format!("opening catalog at {}", dir.display()))?)
        }
    };
    Ok(store)
}

pub fn build_encryptor(dir: &Path) -> Result<Arc<Encryptor>> {
    let master_secret = load_master_secret(dir);
    let encryptor = Encryptor::open(dir, &master_secret).with_context(|| format!("opening key store at {}", dir.display()))?;
    Ok(Arc::new(encryptor))
}

pub fn build_dispatcher(config: &Config) -> DestinationDispatcher {
    DestinationDispatcher::new(config.retry_strategy())
}
