use chrono::{DateTime, NaiveTime, TimeDelta, Utc};

use crate::CoreError;

/// The game's daily reset happens at 05:00 UTC.
pub const DEFAULT_RESET_HOUR_UTC: u32 = 5;

/// A fixed daily boundary in UTC after which cached competitive data counts
/// as stale. All methods are pure functions of their inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyReset {
    at: NaiveTime,
}

impl DailyReset {
    pub fn new(reset_hour_utc: u32) -> Result<Self, CoreError> {
        let at = NaiveTime::from_hms_opt(reset_hour_utc, 0, 0)
            .ok_or(CoreError::InvalidResetHour(reset_hour_utc))?;
        Ok(Self { at })
    }

    pub fn hour(&self) -> u32 {
        use chrono::Timelike;
        self.at.hour()
    }

    fn today(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.date_naive().and_time(self.at).and_utc()
    }

    /// The first boundary strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.today(now);
        if today <= now {
            today + TimeDelta::days(1)
        } else {
            today
        }
    }

    /// The latest boundary at or before `now`.
    pub fn most_recent(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.today(now);
        if today <= now {
            today
        } else {
            today - TimeDelta::days(1)
        }
    }

    /// Whether a boundary has passed since `last_refresh`. Never refreshed
    /// means stale.
    pub fn should_refresh(&self, last_refresh: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        last_refresh.is_none_or(|last| last < self.most_recent(now))
    }
}

impl Default for DailyReset {
    fn default() -> Self {
        Self {
            at: NaiveTime::MIN + TimeDelta::hours(DEFAULT_RESET_HOUR_UTC as i64),
        }
    }
}

/// Next reset boundary after `now` for a reset at `reset_hour_utc:00:00 UTC`.
pub fn next_reset_instant(
    now: DateTime<Utc>,
    reset_hour_utc: u32,
) -> Result<DateTime<Utc>, CoreError> {
    Ok(DailyReset::new(reset_hour_utc)?.next_after(now))
}
