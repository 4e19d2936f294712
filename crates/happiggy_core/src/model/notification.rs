//! Notification preference model.
//!
//! The core never talks to the platform scheduler; it keeps the user's
//! choices and derives the triggers a host should register.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Notification families offered on the settings screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Every day at `daily_time`, nudging the user to deposit a note.
    Daily,
    /// Once, on the bottle's open day at `reminder_time`.
    Reminder,
}

impl NotificationKind {
    pub const ALL: [Self; 2] = [Self::Daily, Self::Reminder];

    pub fn label(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Reminder => "reminder",
        }
    }
}

/// Persisted notification preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub daily_enabled: bool,
    pub daily_time: NaiveTime,
    pub reminder_enabled: bool,
    pub reminder_time: NaiveTime,
}

impl NotificationSettings {
    pub fn is_enabled(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::Daily => self.daily_enabled,
            NotificationKind::Reminder => self.reminder_enabled,
        }
    }

    pub fn set_enabled(&mut self, kind: NotificationKind, enabled: bool) {
        match kind {
            NotificationKind::Daily => self.daily_enabled = enabled,
            NotificationKind::Reminder => self.reminder_enabled = enabled,
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            daily_enabled: false,
            daily_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap_or(NaiveTime::MIN),
            reminder_enabled: false,
            reminder_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}
