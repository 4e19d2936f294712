//! Bottle lifecycle service: D-day and open-eligibility facts.
//!
//! # Responsibility
//! - Derive presentation-ready facts from a bottle's dates and notes.
//!
//! # Invariants
//! - Every function is pure; "now" is always an argument.
//! - Day differences are taken between calendar days, never raw timestamps,
//!   so two moments on the same local day always give the same answer.

use crate::model::bottle::{Bottle, BottleId};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Lifecycle computation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Unreachable for validated bottles; callers should omit the label.
    #[error("bottle {0} has no end date")]
    MissingEndDate(BottleId),
}

/// Anything that can be truncated to a calendar day.
///
/// `DateTime<Tz>` truncates in its own time zone, so passing
/// `DateTime<Local>` floors in the user's local calendar.
pub trait CalendarDay {
    fn calendar_day(&self) -> NaiveDate;
}

impl CalendarDay for NaiveDate {
    fn calendar_day(&self) -> NaiveDate {
        *self
    }
}

impl CalendarDay for NaiveDateTime {
    fn calendar_day(&self) -> NaiveDate {
        self.date()
    }
}

impl<Tz: TimeZone> CalendarDay for DateTime<Tz> {
    fn calendar_day(&self) -> NaiveDate {
        self.date_naive()
    }
}

/// D-day relative to a bottle's end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "days", rename_all = "snake_case")]
pub enum Countdown {
    /// `n > 0` days until the open day.
    Remaining(u32),
    /// Today is the open day.
    DueToday,
    /// The open day passed `n > 0` days ago.
    Overdue(u32),
}

impl Countdown {
    pub fn from_days_remaining(days: i64) -> Self {
        match days {
            0 => Self::DueToday,
            d if d > 0 => Self::Remaining(clamp_days(d)),
            d => Self::Overdue(clamp_days(d.saturating_abs())),
        }
    }
}

impl Display for Countdown {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remaining(days) => write!(f, "D-{days}"),
            Self::DueToday => f.write_str("D-0"),
            Self::Overdue(days) => write!(f, "D+{days}"),
        }
    }
}

/// Notes deposited so far versus one note per day of the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteProgress {
    pub deposited: usize,
    pub goal: usize,
}

/// `floor(end_date) - floor(as_of)` in whole calendar days.
///
/// Positive: days until opening; zero: open day; negative: days overdue.
pub fn days_remaining(bottle: &Bottle, as_of: &impl CalendarDay) -> Result<i64, LifecycleError> {
    let end = end_date(bottle)?;
    Ok(end.signed_duration_since(as_of.calendar_day()).num_days())
}

/// True when the open day has been reached or passed.
pub fn is_open_eligible(bottle: &Bottle, as_of: &impl CalendarDay) -> Result<bool, LifecycleError> {
    Ok(days_remaining(bottle, as_of)? <= 0)
}

/// True when the open day has passed.
pub fn is_overdue(bottle: &Bottle, as_of: &impl CalendarDay) -> Result<bool, LifecycleError> {
    Ok(days_remaining(bottle, as_of)? < 0)
}

pub fn countdown(bottle: &Bottle, as_of: &impl CalendarDay) -> Result<Countdown, LifecycleError> {
    days_remaining(bottle, as_of).map(Countdown::from_days_remaining)
}

/// Renders the D-day label: `D-<n>`, `D-0` or `D+<n>`.
pub fn format_countdown(
    bottle: &Bottle,
    as_of: &impl CalendarDay,
) -> Result<String, LifecycleError> {
    Ok(countdown(bottle, as_of)?.to_string())
}

pub fn has_notes(bottle: &Bottle) -> bool {
    bottle.has_notes()
}

/// Home-screen flag: today is exactly the open day.
pub fn is_today_end_date(
    bottle: &Bottle,
    as_of: &impl CalendarDay,
) -> Result<bool, LifecycleError> {
    Ok(days_remaining(bottle, as_of)? == 0)
}

/// Home-screen flag: the open day is in the past.
pub fn is_end_date_passed(
    bottle: &Bottle,
    as_of: &impl CalendarDay,
) -> Result<bool, LifecycleError> {
    is_overdue(bottle, as_of)
}

/// Inclusive number of calendar days in the bottle's period.
pub fn period_length_days(bottle: &Bottle) -> Result<i64, LifecycleError> {
    let end = end_date(bottle)?;
    Ok(end.signed_duration_since(bottle.start_date).num_days() + 1)
}

pub fn note_progress(bottle: &Bottle) -> Result<NoteProgress, LifecycleError> {
    let goal = usize::try_from(period_length_days(bottle)?).unwrap_or(0);
    Ok(NoteProgress {
        deposited: bottle.note_count(),
        goal,
    })
}

fn end_date(bottle: &Bottle) -> Result<NaiveDate, LifecycleError> {
    bottle
        .end_date
        .ok_or(LifecycleError::MissingEndDate(bottle.id))
}

fn clamp_days(days: i64) -> u32 {
    u32::try_from(days).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{format_countdown, Countdown};
    use crate::model::bottle::Bottle;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn countdown_labels_follow_d_day_convention() {
        assert_eq!(Countdown::from_days_remaining(3).to_string(), "D-3");
        assert_eq!(Countdown::from_days_remaining(0).to_string(), "D-0");
        assert_eq!(Countdown::from_days_remaining(-4).to_string(), "D+4");
    }

    #[test]
    fn missing_end_date_is_reported_not_defaulted() {
        let mut bottle = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
        bottle.end_date = None;
        assert!(format_countdown(&bottle, &day(2023, 1, 5)).is_err());
    }
}
