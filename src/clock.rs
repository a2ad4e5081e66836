use std::sync::RwLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Source of the current local wall-clock time.
///
/// Every time-dependent rule (status sweep, venue and staff projections) reads
/// `now()` through this trait, never the system clock directly.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Naive local time of the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn at(date: NaiveDate, time: NaiveTime) -> Self {
        Self::new(date.and_time(time))
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move to another time of the current day.
    pub fn set_time(&self, time: NaiveTime) {
        let date = self.now().date();
        self.set(date.and_time(time));
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn manual_clock_moves_only_when_told() {
        let day = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let clock = ManualClock::at(day, hm(9, 0));
        assert_eq!(clock.now(), day.and_time(hm(9, 0)));

        clock.set_time(hm(15, 30));
        assert_eq!(clock.now(), day.and_time(hm(15, 30)));

        clock.advance(Duration::hours(10));
        assert_eq!(clock.today(), day.succ_opt().unwrap());
        assert_eq!(clock.now().time(), hm(1, 30));
    }

    #[test]
    fn system_clock_is_close_to_local_now() {
        let before = chrono::Local::now().naive_local();
        let now = SystemClock.now();
        assert!(now >= before);
    }
}
