//! Home-screen summary.
//!
//! Reads the bottle in progress and derives every flag the home tab shows.
//! Lifecycle failures only drop the affected label.

use crate::clock::Clock;
use crate::model::bottle::Bottle;
use crate::repo::bottle_repo::BottleRepository;
use crate::repo::RepoResult;
use crate::service::lifecycle::{self, CalendarDay, LifecycleError, NoteProgress};
use log::warn;
use serde::Serialize;

/// Presentation facts for the home tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomeSummary {
    pub bottle: Option<Bottle>,
    /// `D-n` / `D-0` / `D+n`; `None` without a bottle or a usable end date.
    pub countdown: Option<String>,
    pub is_today_end_date: bool,
    pub is_end_date_passed: bool,
    pub has_notes: bool,
    pub progress: Option<NoteProgress>,
}

impl HomeSummary {
    /// Builds the summary for `bottle` as seen on `as_of`.
    pub fn from_bottle(bottle: Option<Bottle>, as_of: &impl CalendarDay) -> Self {
        let Some(bottle) = bottle else {
            return Self::empty();
        };

        let countdown = lifecycle::format_countdown(&bottle, as_of)
            .map_err(log_lifecycle_failure)
            .ok();
        let is_today_end_date = lifecycle::is_today_end_date(&bottle, as_of).unwrap_or(false);
        let is_end_date_passed = lifecycle::is_end_date_passed(&bottle, as_of).unwrap_or(false);
        let progress = lifecycle::note_progress(&bottle).ok();

        Self {
            countdown,
            is_today_end_date,
            is_end_date_passed,
            has_notes: lifecycle::has_notes(&bottle),
            progress,
            bottle: Some(bottle),
        }
    }

    pub fn empty() -> Self {
        Self {
            bottle: None,
            countdown: None,
            is_today_end_date: false,
            is_end_date_passed: false,
            has_notes: false,
            progress: None,
        }
    }

    pub fn has_bottle(&self) -> bool {
        self.bottle.is_some()
    }
}

/// Home-tab facade over a repository and a clock.
pub struct HomeService<R: BottleRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: BottleRepository, C: Clock> HomeService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    pub fn summary(&self) -> RepoResult<HomeSummary> {
        let bottle = self.repo.current_bottle()?;
        Ok(HomeSummary::from_bottle(bottle, &self.clock.now_local()))
    }
}

fn log_lifecycle_failure(err: LifecycleError) {
    warn!("event=home_summary module=service status=degraded reason=\"{err}\"");
}
