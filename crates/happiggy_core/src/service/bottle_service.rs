//! Bottle use-case service.
//!
//! # Responsibility
//! - Start, fill, open and delete bottles on behalf of the UI.
//! - Stamp new bottles and notes with the injected clock.
//!
//! # Invariants
//! - A new bottle is rejected while another one is still in progress.
//! - Notes always go into the bottle in progress.

use crate::clock::Clock;
use crate::model::bottle::{Bottle, BottleId};
use crate::model::error::InvalidOperationError;
use crate::model::note::{Note, NoteContent, NoteDraft};
use crate::repo::bottle_repo::{BottleListQuery, BottleRepository};
use crate::repo::{RepoError, RepoResult};
use chrono::NaiveDate;
use log::{info, warn};

/// Bottle service facade over a repository and a clock.
pub struct BottleService<R: BottleRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: BottleRepository, C: Clock> BottleService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    pub fn current_bottle(&self) -> RepoResult<Option<Bottle>> {
        self.repo.current_bottle()
    }

    /// Starts a bottle today that can be opened on `end_date`.
    ///
    /// # Errors
    /// - `InvalidOperationError::ActiveBottleExists` while one is in progress.
    /// - `ValidationError::EndBeforeStart` when `end_date` is before today.
    pub fn start_bottle(&mut self, end_date: NaiveDate) -> RepoResult<Bottle> {
        if let Some(current) = self.repo.current_bottle()? {
            warn!("event=bottle_start module=service status=rejected reason=active_bottle_exists");
            return Err(InvalidOperationError::ActiveBottleExists(current.id).into());
        }

        let bottle = Bottle::new(self.clock.today(), end_date)?;
        self.repo.save(&bottle)?;
        info!(
            "event=bottle_start module=service status=ok period_days={}",
            end_date
                .signed_duration_since(bottle.start_date)
                .num_days()
                + 1
        );
        Ok(bottle)
    }

    /// Deposits a note into the bottle in progress.
    pub fn deposit_note(&mut self, content: NoteContent) -> RepoResult<Note> {
        let current = self
            .repo
            .current_bottle()?
            .ok_or(InvalidOperationError::NoActiveBottle)?;
        self.deposit_note_into(current.id, content)
    }

    /// Deposits a note into a specific bottle.
    pub fn deposit_note_into(&mut self, bottle_id: BottleId, content: NoteContent) -> RepoResult<Note> {
        let draft = NoteDraft::new(content, self.clock.now_utc());
        self.repo.add_note(bottle_id, &draft)
    }

    /// Opens the bottle in progress and returns it with all notes.
    pub fn open_current(&mut self) -> RepoResult<Bottle> {
        let current = self
            .repo
            .current_bottle()?
            .ok_or(InvalidOperationError::NoActiveBottle)?;
        self.open_bottle(current.id)
    }

    /// Opens a bottle, also before its end date.
    pub fn open_bottle(&mut self, id: BottleId) -> RepoResult<Bottle> {
        self.repo.open_bottle(id)?;
        self.repo.get_bottle(id)?.ok_or(RepoError::NotFound(id))
    }

    pub fn delete_bottle(&mut self, id: BottleId) -> RepoResult<()> {
        self.repo.delete_bottle(id)
    }

    /// Opened bottles, most recent first.
    pub fn history(&self) -> RepoResult<Vec<Bottle>> {
        self.repo.list_bottles(&BottleListQuery {
            opened: Some(true),
            ..BottleListQuery::default()
        })
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}
