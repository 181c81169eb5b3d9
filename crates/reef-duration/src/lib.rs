//! Duration parsing and serde codecs shared across the Reef workspace.
//!
//! Config fields that hold a [`std::time::Duration`] accept either a
//! human-readable string (`"30s"`, `"5m"`) or a raw millisecond count, so
//! `reef.toml` files and catalog JSON can be hand-edited without needing to
//! know which encoding a given field expects.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Deserialize a [`Duration`] from either a humantime string or milliseconds.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DurationHelper {
        String(String),
        Millis(u64),
    }

    match DurationHelper::deserialize(deserializer)? {
        DurationHelper::String(s) => humantime::parse_duration(&s)
            .map_err(|e| serde::de::Error::custom(format!("invalid duration {s:?}: {e}"))),
        DurationHelper::Millis(ms) => Ok(Duration::from_millis(ms)),
    }
}

/// Serialize a [`Duration`] as milliseconds so it round-trips with
/// [`deserialize_duration`].
pub fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Parse a duration string, accepting both humantime (`"10s"`) and a bare
/// integer number of seconds (`"10"`).
pub fn parse_seconds_or_humantime(s: &str) -> Result<Duration, humantime::DurationError> {
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s)
}

/// Clamp a configured value into an inclusive range, returning the
/// configured value unchanged when it already fits.
pub fn clamp_u32(value: u32, min: u32, max: u32) -> u32 {
    value.clamp(min, max)
}
