use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reef_types::Schedule;

/// §4.C10 next-run calculation: Cron -> next occurrence from now; Interval
/// -> now + interval minutes; Webhook/Manual don't self-schedule so they
/// fall back to the same +1h placeholder a corrupted cron expression would
/// get, since neither variant is expected to reach the producer loop.
pub fn compute_next_run(schedule: &Schedule, now: DateTime<Utc>) -> DateTime<Utc> {
    match schedule {
        Schedule::Cron { expression } => expression
            .parse::<cron::Schedule>()
            .ok()
            .and_then(|s| s.after(&now).next())
            .unwrap_or_else(|| now + ChronoDuration::hours(1)),
        Schedule::Interval { minutes } => now + ChronoDuration::minutes(*minutes as i64),
        Schedule::Webhook | Schedule::Manual => now + ChronoDuration::hours(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_schedule_adds_minutes() {
        let now = Utc::now();
        let next = compute_next_run(&Schedule::Interval { minutes: 15 }, now);
        assert_eq!(next, now + ChronoDuration::minutes(15));
    }

    #[test]
    fn cron_schedule_yields_a_future_occurrence() {
        let now = Utc::now();
        let schedule = Schedule::Cron { expression: "0 0 * * * *".into() };
        let next = compute_next_run(&schedule, now);
        assert!(next > now);
    }

    #[test]
    fn malformed_cron_falls_back_to_one_hour() {
        let now = Utc::now();
        let schedule = Schedule::Cron { expression: "garbage".into() };
        let next = compute_next_run(&schedule, now);
        assert_eq!(next, now + ChronoDuration::hours(1));
    }

    #[test]
    fn webhook_and_manual_fall_back_to_one_hour() {
        let now = Utc::now();
        assert_eq!(compute_next_run(&Schedule::Webhook, now), now + ChronoDuration::hours(1));
        assert_eq!(compute_next_run(&Schedule::Manual, now), now + ChronoDuration::hours(1));
    }
}
