//! Notification preferences and plan derivation.
//!
//! # Responsibility
//! - Persist daily/reminder toggles and times.
//! - Compute which triggers a host should register; no scheduling happens
//!   here.
//!
//! # Invariants
//! - Stored times have minute precision.
//! - A reminder is only planned for a bottle in progress whose open-day
//!   moment is still ahead.

use crate::model::bottle::Bottle;
use crate::model::notification::{NotificationKind, NotificationSettings};
use crate::repo::settings_repo::SettingsRepository;
use crate::repo::RepoResult;
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use log::info;
use serde::Serialize;

/// When a planned notification fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "repeat", content = "at", rename_all = "snake_case")]
pub enum Trigger {
    /// Every day at this local time.
    Daily(NaiveTime),
    /// Once, at this local date and time.
    Once(NaiveDateTime),
}

/// One notification the host should have registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedNotification {
    pub kind: NotificationKind,
    pub trigger: Trigger,
}

/// Notification settings service over a settings repository.
pub struct NotificationService<R: SettingsRepository> {
    repo: R,
}

impl<R: SettingsRepository> NotificationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn settings(&self) -> RepoResult<NotificationSettings> {
        self.repo.load_notification_settings()
    }

    /// Turns one notification family on or off.
    pub fn set_enabled(
        &mut self,
        kind: NotificationKind,
        enabled: bool,
    ) -> RepoResult<NotificationSettings> {
        let mut settings = self.repo.load_notification_settings()?;
        settings.set_enabled(kind, enabled);
        self.repo.save_notification_settings(&settings)?;
        info!(
            "event=notification_toggle module=service status=ok kind={} enabled={enabled}",
            kind.label()
        );
        Ok(settings)
    }

    pub fn set_daily_time(&mut self, time: NaiveTime) -> RepoResult<NotificationSettings> {
        let mut settings = self.repo.load_notification_settings()?;
        settings.daily_time = truncate_to_minute(time);
        self.repo.save_notification_settings(&settings)?;
        Ok(settings)
    }

    pub fn set_reminder_time(&mut self, time: NaiveTime) -> RepoResult<NotificationSettings> {
        let mut settings = self.repo.load_notification_settings()?;
        settings.reminder_time = truncate_to_minute(time);
        self.repo.save_notification_settings(&settings)?;
        Ok(settings)
    }

    /// Loads settings and derives the plan for `current`.
    pub fn plan(
        &self,
        current: Option<&Bottle>,
        now: NaiveDateTime,
    ) -> RepoResult<Vec<PlannedNotification>> {
        let settings = self.repo.load_notification_settings()?;
        Ok(plan_notifications(&settings, current, now))
    }
}

/// Derives the notifications a host should keep registered.
pub fn plan_notifications(
    settings: &NotificationSettings,
    current: Option<&Bottle>,
    now: NaiveDateTime,
) -> Vec<PlannedNotification> {
    let mut planned = Vec::new();

    if settings.daily_enabled {
        planned.push(PlannedNotification {
            kind: NotificationKind::Daily,
            trigger: Trigger::Daily(settings.daily_time),
        });
    }

    if settings.reminder_enabled {
        let reminder_at = current
            .filter(|bottle| !bottle.is_opened)
            .and_then(|bottle| bottle.end_date)
            .map(|end| end.and_time(settings.reminder_time))
            .filter(|at| *at > now);
        if let Some(at) = reminder_at {
            planned.push(PlannedNotification {
                kind: NotificationKind::Reminder,
                trigger: Trigger::Once(at),
            });
        }
    }

    planned
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}
