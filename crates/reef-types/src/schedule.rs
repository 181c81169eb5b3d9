use serde::{Deserialize, Serialize};

/// How a profile or job is triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    Cron { expression: String },
    Interval { minutes: u32 },
    Webhook,
    Manual,
}

impl Schedule {
    /// A `Cron` schedule's expression must parse; all other variants are
    /// unconditionally valid (§3 Profile invariants).
    pub fn validate(&self) -> Result<(), ScheduleError> {
        match self {
            Schedule::Cron { expression } => expression
                .parse::<cron::Schedule>()
                .map(|_| ())
                .map_err(|source| ScheduleError::InvalidCron {
                    expression: expression.clone(),
                    source,
                }),
            Schedule::Interval { minutes } if *minutes == 0 => {
                Err(ScheduleError::ZeroInterval)
            }
            Schedule::Interval { .. } | Schedule::Webhook | Schedule::Manual => Ok(()),
        }
    }
}

/// Errors surfaced when validating a [`Schedule`] at catalog-write time.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid cron expression {expression:?}: {source}")]
    InvalidCron {
        expression: String,
        #[source]
        source: cron::error::Error,
    },
    #[error("interval schedule must be at least 1 minute")]
    ZeroInterval,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_cron_expression_passes() {
        let schedule = Schedule::Cron {
            expression: "0 0 * * * *".into(),
        };
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn malformed_cron_expression_fails() {
        let schedule = Schedule::Cron {
            expression: "not a cron expression".into(),
        };
        assert!(matches!(
            schedule.validate(),
            Err(ScheduleError::InvalidCron { .. })
        ));
    }

    #[test]
    fn zero_minute_interval_rejected() {
        let schedule = Schedule::Interval { minutes: 0 };
        assert!(matches!(schedule.validate(), Err(ScheduleError::ZeroInterval)));
    }

    #[test]
    fn manual_and_webhook_always_valid() {
        assert!(Schedule::Manual.validate().is_ok());
        assert!(Schedule::Webhook.validate().is_ok());
    }
}
