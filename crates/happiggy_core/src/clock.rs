//! Wall-clock abstraction injected into use-case services.
//!
//! Lifecycle math only ever needs the user's local wall-clock time; services
//! take a `Clock` so tests can pin "today".

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Source of the current local date and time.
pub trait Clock {
    /// Current wall-clock time in the user's local calendar.
    fn now_local(&self) -> NaiveDateTime;

    /// Current instant, used for deposit timestamps.
    fn now_utc(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now_local().date()
    }
}

/// Reads the operating system clock and time zone.
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

/// Clock pinned to one local wall-clock moment.
///
/// The local time is interpreted as UTC for `now_utc`, which keeps deposit
/// timestamps deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock {
    now: NaiveDateTime,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }

    /// Fixed clock at noon of `day`.
    pub fn at_noon(day: NaiveDate) -> Self {
        Self::new(day.and_hms_opt(12, 0, 0).unwrap_or_default())
    }

    pub fn set(&mut self, now: NaiveDateTime) {
        self.now = now;
    }
}

impl Clock for FixedClock {
    fn now_local(&self) -> NaiveDateTime {
        self.now
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.now)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_local(&self) -> NaiveDateTime {
        (**self).now_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        (**self).now_utc()
    }
}
