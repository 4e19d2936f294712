//! Core domain logic for Happiggy-bank.
//! This crate is the single source of truth for bottle and note invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::bottle::{Bottle, BottleId};
pub use model::error::{DomainError, InvalidOperationError, ValidationError};
pub use model::note::{Note, NoteContent, NoteDraft, NoteId};
pub use model::notification::{NotificationKind, NotificationSettings};
pub use repo::bottle_repo::{BottleListQuery, BottleRepository, SqliteBottleRepository};
pub use repo::settings_repo::{SettingsRepository, SqliteSettingsRepository};
pub use repo::{PersistenceError, RepoError, RepoResult, UserNotice};
pub use service::bottle_service::BottleService;
pub use service::home_service::{HomeService, HomeSummary};
pub use service::lifecycle::{CalendarDay, Countdown, LifecycleError, NoteProgress};
pub use service::notification_service::{
    plan_notifications, NotificationService, PlannedNotification, Trigger,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
