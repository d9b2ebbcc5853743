//! Cron trigger evaluated in a fixed IANA timezone.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Next fire time of `schedule` strictly after `now`, interpreted in `tz`.
pub fn next_fire(schedule: &cron::Schedule, tz: Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule
        .after(&now.with_timezone(&tz))
        .next()
        .map(|t| t.with_timezone(&Utc))
}
