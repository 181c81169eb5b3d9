//! Notification cooldown gate (§4.C3).
//!
//! A process-wide `(event_kind, key) -> last_notified_at` map. Profile and
//! job runners call [`NotificationThrottle::should_notify`] before sending
//! a webhook or email alert so a flapping job doesn't re-notify on every
//! attempt.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Default per-event-kind cooldowns, in seconds, from §4.C3.
pub mod cooldowns {
    pub const PROFILE_FAILURE_SECONDS: i64 = 300;
    pub const PROFILE_SUCCESS_SECONDS: i64 = 1800;
    pub const JOB_FAILURE_SECONDS: i64 = 300;
    pub const JOB_SUCCESS_SECONDS: i64 = 1800;
    pub const DATABASE_SIZE_ALERT_SECONDS: i64 = 3600;
    /// User/API-key/webhook creation notifications are never throttled.
    pub const CREATION_EVENT_SECONDS: i64 = 0;
}

/// How long an idle `(event_kind, key)` entry survives before the
/// background GC sweeps it away.
pub const EVICTION_AGE: ChronoDuration = ChronoDuration::hours(24);

#[derive(Debug, Default)]
pub struct NotificationThrottle {
    last_notified: Mutex<HashMap<(String, String), DateTime<Utc>>>,
}

impl NotificationThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` (and records "now" as the new timestamp) if no
    /// notification for `(event_kind, key)` has fired within
    /// `cooldown_seconds`. A `cooldown_seconds` of `0` always notifies
    /// (and still records the timestamp, for [`Self::evict_stale`]'s
    /// benefit).
    pub fn should_notify(&self, event_kind: &str, key: &str, cooldown_seconds: i64) -> bool {
        let now = Utc::now();
        let mut map = self.last_notified.lock().expect("throttle mutex poisoned");
        let entry_key = (event_kind.to_string(), key.to_string());

        let should = match map.get(&entry_key) {
            None => true,
            Some(last) => cooldown_seconds <= 0 || now - *last >= ChronoDuration::seconds(cooldown_seconds),
        };

        if should {
            map.insert(entry_key, now);
        }
        should
    }

    /// Remove entries whose last-notified timestamp is older than
    /// [`EVICTION_AGE`]. Intended to run on a 10-minute tick from the
    /// scheduler (§4.C3).
    pub fn evict_stale(&self) {
        let cutoff = Utc::now() - EVICTION_AGE;
        let mut map = self.last_notified.lock().expect("throttle mutex poisoned");
        map.retain(|_, last| *last >= cutoff);
    }

    pub fn len(&self) -> usize {
        self.last_notified.lock().expect("throttle mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
