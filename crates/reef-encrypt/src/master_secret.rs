//! Master-secret resolution for wrapping the RSA private key (§4.C1, §6).
//!
//! Priority: machine-scoped env var → process env var → `.env` file next
//! to the catalog → fallback constant. This crate's host OS exposes a
//! single process environment (no separate machine/process env
//! namespaces the way Windows' registry-backed `SetEnvironmentVariable`
//! scopes do), so both of the first two steps read the same
//! `std::env::var` call; the distinction is kept as two named steps so a
//! future platform-specific machine-scope lookup has somewhere to go
//! without touching call sites.

use std::fs;
use std::path::Path;

/// Name of the environment variable carrying the master secret.
pub const MASTER_SECRET_ENV_VAR: &str = "REEF_ENCRYPTION_KEY";

/// Used only if no other source provides a secret. Documented and
/// intentionally weak: operators are expected to set
/// `REEF_ENCRYPTION_KEY` in any environment that matters.
const FALLBACK_MASTER_SECRET: &str = "reef-default-master-secret-change-me";

/// Resolve the master secret used to wrap/unwrap the RSA private key.
pub fn load_master_secret(catalog_dir: &Path) -> String {
    if let Ok(value) = std::env::var(MASTER_SECRET_ENV_VAR) {
        if !value.is_empty() {
            return value;
        }
    }

    if let Some(value) = read_dot_env(catalog_dir) {
        return value;
    }

    FALLBACK_MASTER_SECRET.to_string()
}

/// Look for `REEF_ENCRYPTION_KEY=...` in a `.env` file next to the
/// catalog. Lines are `KEY=VALUE`; `#`-prefixed lines and blank lines are
/// skipped; surrounding single/double quotes on the value are stripped.
fn read_dot_env(catalog_dir: &Path) -> Option<String> {
    let content = fs::read_to_string(catalog_dir.join(".env")).ok()?;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = line.split_once('=')?;
        if key.trim() != MASTER_SECRET_ENV_VAR {
            continue;
        }
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }
    None
}
