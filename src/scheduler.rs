//! Timer that fires registered jobs at fixed cadences.
//!
//! Holds no business logic: it only knows job names and when they are due.
//! Jobs run one at a time; a tick that comes due while a job is still running
//! waits for it, and missed interval ticks are coalesced.

use crate::config::ScheduleConfig;
use crate::constants::{GRID_CONDITIONS_JOB, LOAD_AND_WEATHER_JOB};
use crate::jobs::{JobContext, JobRegistry};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Every { minutes: u32 },
    DailyAt { hour: u32, minute: u32 },
}

impl Cadence {
    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: NaiveDateTime) -> NaiveDateTime {
        match *self {
            Cadence::Every { minutes } => after + Duration::minutes(i64::from(minutes.max(1))),
            Cadence::DailyAt { hour, minute } => {
                let Some(at) = NaiveTime::from_hms_opt(hour, minute, 0) else {
                    return after + Duration::days(1);
                };
                let today = after.date().and_time(at);
                if today > after {
                    today
                } else {
                    today + Duration::days(1)
                }
            }
        }
    }

    /// Next fire time after a run that was due at `due` finished at `now`.
    pub fn reschedule(&self, due: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
        match *self {
            Cadence::Every { .. } => {
                let mut next = self.next_after(due);
                while next <= now {
                    next = self.next_after(next);
                }
                next
            }
            Cadence::DailyAt { .. } => self.next_after(now),
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Every { minutes } => write!(f, "every {} min", minutes),
            Cadence::DailyAt { hour, minute } => write!(f, "daily at {:02}:{:02}", hour, minute),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub job: &'static str,
    pub cadence: Cadence,
}

/// The standard schedule: grid conditions on an interval, load and weather
/// once a day.
pub fn default_schedule(config: &ScheduleConfig) -> Vec<ScheduleEntry> {
    vec![
        ScheduleEntry {
            job: GRID_CONDITIONS_JOB,
            cadence: Cadence::Every {
                minutes: config.grid_conditions_interval_minutes,
            },
        },
        ScheduleEntry {
            job: LOAD_AND_WEATHER_JOB,
            cadence: Cadence::DailyAt {
                hour: config.daily_hour,
                minute: config.daily_minute,
            },
        },
    ]
}

pub struct Scheduler {
    entries: Vec<ScheduleEntry>,
    next_due: Vec<NaiveDateTime>,
}

impl Scheduler {
    pub fn new(entries: Vec<ScheduleEntry>, start: NaiveDateTime) -> Self {
        let next_due = entries.iter().map(|e| e.cadence.next_after(start)).collect();
        Self { entries, next_due }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Index and due time of the entry that fires next; ties go to the
    /// entry listed first.
    pub fn next(&self) -> Option<(usize, NaiveDateTime)> {
        self.next_due
            .iter()
            .copied()
            .enumerate()
            .min_by_key(|&(i, due)| (due, i))
    }

    /// Record that entry `index` ran, with the clock now at `now`.
    pub fn mark_ran(&mut self, index: usize, now: NaiveDateTime) {
        if let (Some(entry), Some(due)) = (self.entries.get(index), self.next_due.get_mut(index)) {
            *due = entry.cadence.reschedule(*due, now);
        }
    }

    /// Run forever, or until ctrl-c.
    pub async fn run(mut self, registry: &JobRegistry, ctx: &JobContext) {
        for entry in &self.entries {
            if !registry.contains(entry.job) {
                warn!(job = entry.job, "scheduled job is not registered and will be skipped");
            }
        }
        loop {
            let Some((index, due)) = self.next() else {
                warn!("nothing scheduled");
                return;
            };
            let job = self.entries[index].job;
            let wait = (due - ctx.clock.now()).to_std().unwrap_or_default();
            debug!(job, due = %due, wait_secs = wait.as_secs(), "waiting for next job");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested, scheduler stopping");
                    return;
                }
            }

            if registry.contains(job) {
                // failures are logged by the registry; the next tick retries
                let _ = registry.run(job, ctx).await;
            }
            self.mark_ran(index, ctx.clock.now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_interval_fires_after_period() {
        let every5 = Cadence::Every { minutes: 5 };
        assert_eq!(every5.next_after(at(5, 10, 0)), at(5, 10, 5));
    }

    #[test]
    fn test_daily_fires_today_or_tomorrow() {
        let daily = Cadence::DailyAt { hour: 23, minute: 58 };
        assert_eq!(daily.next_after(at(5, 10, 0)), at(5, 23, 58));
        assert_eq!(daily.next_after(at(5, 23, 58)), at(6, 23, 58));
        assert_eq!(daily.next_after(at(5, 23, 59)), at(6, 23, 58));
    }

    #[test]
    fn test_overrunning_interval_coalesces_missed_ticks() {
        let every5 = Cadence::Every { minutes: 5 };
        // due 10:05, job finished 10:17 -> next slot on the original grid after 10:17
        assert_eq!(every5.reschedule(at(5, 10, 5), at(5, 10, 17)), at(5, 10, 20));
        assert_eq!(every5.reschedule(at(5, 10, 5), at(5, 10, 6)), at(5, 10, 10));
    }

    #[test]
    fn test_scheduler_picks_earliest_and_advances() {
        let config = ScheduleConfig::default();
        let mut sched = Scheduler::new(default_schedule(&config), at(5, 23, 50));

        assert_eq!(sched.next(), Some((0, at(5, 23, 55))));
        sched.mark_ran(0, at(5, 23, 55));

        assert_eq!(sched.next(), Some((1, at(5, 23, 58))));
        sched.mark_ran(1, at(5, 23, 59));

        assert_eq!(sched.next(), Some((0, at(6, 0, 0))));
        assert_eq!(sched.entries()[1].cadence.to_string(), "daily at 23:58");
    }
}
