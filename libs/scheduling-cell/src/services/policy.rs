// libs/scheduling-cell/src/services/policy.rs
use std::sync::{Arc, RwLock};

use chrono::{Datelike, Duration, Local, NaiveDateTime, Timelike};
use tracing::{debug, warn};

use crate::error::PolicyViolation;
use crate::models::{CalendarDate, ClockTime, LocalTimestamp};
use crate::services::codec;

/// Source of "now" as local wall-clock time, without any offset.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The host's local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: RwLock::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        match self.now.write() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// True iff `date` is strictly before the day of `now`. Today is not past.
///
/// Compares (year, month, day) directly, so a range-valid but non-existent
/// day such as 31/02 is ordered where it reads instead of rolling over.
pub fn is_past_date_at(date: &CalendarDate, now: NaiveDateTime) -> bool {
    (date.year(), date.month(), date.day()) < (now.year(), now.month(), now.day())
}

/// True iff the timestamp's minute is at or before the minute of `now`.
/// Seconds are ignored on both sides, so "now" itself is past.
pub fn is_past_instant_at(timestamp: &LocalTimestamp, now: NaiveDateTime) -> bool {
    let date = timestamp.date();
    let time = timestamp.time();
    (date.year(), date.month(), date.day(), time.hour(), time.minute())
        <= (now.year(), now.month(), now.day(), now.hour(), now.minute())
}

/// The past-date / past-instant rules every entry point applies.
#[derive(Clone)]
pub struct TemporalPolicyGuard {
    clock: Arc<dyn Clock>,
}

impl TemporalPolicyGuard {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn today(&self) -> Option<CalendarDate> {
        CalendarDate::from_naive(self.clock.now().date())
    }

    pub fn is_past_date(&self, date: &CalendarDate) -> bool {
        is_past_date_at(date, self.clock.now())
    }

    pub fn is_past_instant(&self, timestamp: &LocalTimestamp) -> bool {
        is_past_instant_at(timestamp, self.clock.now())
    }

    pub fn check_date(&self, date: &CalendarDate) -> Result<(), PolicyViolation> {
        if self.is_past_date(date) {
            warn!("Rejected past date {}", date);
            return Err(PolicyViolation::PastDate);
        }
        Ok(())
    }

    pub fn check_instant(&self, timestamp: &LocalTimestamp) -> Result<(), PolicyViolation> {
        if self.is_past_instant(timestamp) {
            warn!("Rejected past instant {}", timestamp);
            return Err(PolicyViolation::PastInstant);
        }
        Ok(())
    }

    /// Both rules, in order: the date alone, then the combination once a time
    /// is present. Must be re-run whenever either side changes.
    pub fn check_schedule(
        &self,
        date: &CalendarDate,
        time: Option<&ClockTime>,
    ) -> Result<(), PolicyViolation> {
        self.check_date(date)?;

        if let Some(timestamp) = codec::combine_local_timestamp(Some(date), time) {
            self.check_instant(&timestamp)?;
        }

        debug!("Schedule {} {:?} passes temporal policy", date, time.map(ToString::to_string));
        Ok(())
    }
}

impl std::fmt::Debug for TemporalPolicyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporalPolicyGuard")
            .field("now", &self.clock.now())
            .finish()
    }
}
