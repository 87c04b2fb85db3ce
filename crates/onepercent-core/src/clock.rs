//! Wall-clock access.
//!
//! Streaks are computed against the local calendar date and reminders match
//! the local wall-clock minute, so both go through a [`Clock`] that tests can
//! pin to a fixed instant.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now_local(&self) -> NaiveDateTime;

    /// Current instant in UTC.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Today's local calendar date.
    fn today(&self) -> NaiveDate {
        self.now_local().date()
    }
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant. Local time is taken to equal UTC.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: NaiveDateTime,
}

impl FixedClock {
    pub fn new(at: NaiveDateTime) -> Self {
        Self { at }
    }

    /// Midnight of the given date.
    pub fn on(date: NaiveDate) -> Self {
        Self::new(date.and_time(chrono::NaiveTime::MIN))
    }
}

impl Clock for FixedClock {
    fn now_local(&self) -> NaiveDateTime {
        self.at
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.at)
    }
}
