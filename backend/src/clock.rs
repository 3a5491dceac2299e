//! Deterministic time source for the engine.
//!
//! The engine never reads the ambient wall clock during an operation; every
//! timestamp and business date comes from an `EngineClock` that is advanced
//! explicitly. Batch jobs and tests drive the clock, which makes schedule
//! generation, late flags, and default detection reproducible.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Explicitly-advanced clock supplying instants and business dates.
///
/// # Example
///
/// ```
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use lendvault_core_rs::clock::EngineClock;
///
/// let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
/// let mut clock = EngineClock::starting_at(start);
/// assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
///
/// clock.advance_days(7);
/// assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 1, 12).unwrap());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineClock {
    now: DateTime<Utc>,
}

impl EngineClock {
    /// Clock pinned to a specific instant.
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Clock seeded from the system time. Use `starting_at` in tests.
    pub fn system() -> Self {
        Self { now: Utc::now() }
    }

    /// Current instant.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Current business date (UTC).
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// Move the clock forward by whole days.
    pub fn advance_days(&mut self, days: i64) {
        self.now += Duration::days(days);
    }

    /// Pin the clock to a new instant. Must not move backwards in normal
    /// operation; callers own that discipline.
    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_advance_days_crosses_months() {
        let start = Utc.with_ymd_and_hms(2026, 1, 30, 12, 0, 0).unwrap();
        let mut clock = EngineClock::starting_at(start);
        clock.advance_days(3);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 2, 2).unwrap());
    }
}
