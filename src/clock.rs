use chrono::{Local, NaiveDate, NaiveDateTime};
use std::sync::Mutex;

/// Source of "now" for jobs and the scheduler, in local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn at_date(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(12, 0, 0).unwrap_or_default())
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_moves_only_when_set() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let clock = FixedClock::at_date(date);
        assert_eq!(clock.today(), date);

        let later = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap().and_hms_opt(0, 1, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
        assert_eq!(clock.today(), later.date());
    }
}
