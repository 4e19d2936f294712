//! FFI use-case API for the mobile host.
//!
//! # Responsibility
//! - Expose stable, use-case-level functions to Dart via FRB.
//! - Turn core errors into envelopes with an optional dismissible notice.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Dates cross the boundary as `YYYY-MM-DD`, times as `HH:MM`.
//! - One SQLite connection per call; no connection outlives a call.

use chrono::{NaiveDate, NaiveTime};
use happiggy_core::config::default_db_path;
use happiggy_core::db::open_db;
use happiggy_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    BottleId, BottleService, Clock, HomeService, HomeSummary, NoteContent, NotificationKind,
    NotificationService, NotificationSettings, RepoError, SqliteBottleRepository,
    SqliteSettingsRepository, SystemClock, UserNotice,
};
use log::warn;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Idempotent for the same `level + log_dir`; conflicting calls fail.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Pins the database file used by every later call.
///
/// # FFI contract
/// - Must be called before the first data call to take effect.
/// - Calling again with the same path is a no-op; a different path fails.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_db_path(db_path: String) -> String {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return "db_path cannot be empty".to_string();
    }
    let requested = PathBuf::from(trimmed);
    let active = DB_PATH.get_or_init(|| requested.clone());
    if *active == requested {
        String::new()
    } else {
        format!(
            "db path already configured at `{}`; refusing to switch to `{}`",
            active.display(),
            requested.display()
        )
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BottleActionResponse {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Affected bottle id.
    pub bottle_id: Option<String>,
    /// Created note id for deposit calls.
    pub note_id: Option<String>,
    /// Human-readable result for diagnostics/UI.
    pub message: String,
    /// Dismissible alert to show, set for storage failures.
    pub notice_title: Option<String>,
    pub notice_message: Option<String>,
}

impl BottleActionResponse {
    fn success(message: impl Into<String>, bottle_id: BottleId) -> Self {
        Self {
            ok: true,
            bottle_id: Some(bottle_id.to_string()),
            note_id: None,
            message: message.into(),
            notice_title: None,
            notice_message: None,
        }
    }

    fn failure(failure: CallFailure) -> Self {
        let (notice_title, notice_message) = failure.notice_parts();
        Self {
            ok: false,
            bottle_id: None,
            note_id: None,
            message: failure.message,
            notice_title,
            notice_message,
        }
    }
}

/// Home tab projection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HomeSummaryResponse {
    pub ok: bool,
    pub has_bottle: bool,
    pub bottle_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// `D-n` / `D-0` / `D+n`; absent when it cannot be computed.
    pub countdown: Option<String>,
    pub is_today_end_date: bool,
    pub is_end_date_passed: bool,
    pub has_notes: bool,
    pub note_count: u32,
    /// One note per day of the period.
    pub note_goal: u32,
    pub message: String,
    pub notice_title: Option<String>,
    pub notice_message: Option<String>,
}

/// Notification settings projection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationSettingsResponse {
    pub ok: bool,
    pub daily_enabled: bool,
    /// `HH:MM`.
    pub daily_time: String,
    pub reminder_enabled: bool,
    /// `HH:MM`.
    pub reminder_time: String,
    pub message: String,
    pub notice_title: Option<String>,
    pub notice_message: Option<String>,
}

/// Starts a bottle today that opens on `end_date` (`YYYY-MM-DD`).
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Fails while another bottle is in progress.
#[flutter_rust_bridge::frb(sync)]
pub fn bottle_start(end_date: String) -> BottleActionResponse {
    bottle_start_at(&resolve_db_path(), &SystemClock, &end_date)
}

/// Deposits a text note into the bottle in progress.
#[flutter_rust_bridge::frb(sync)]
pub fn note_deposit_text(text: String) -> BottleActionResponse {
    note_deposit_text_at(&resolve_db_path(), &SystemClock, text)
}

/// Deposits a photo note (`image_ref` is the host's stored asset path).
#[flutter_rust_bridge::frb(sync)]
pub fn note_deposit_image(image_ref: String) -> BottleActionResponse {
    note_deposit_at(
        &resolve_db_path(),
        &SystemClock,
        NoteContent::image(image_ref.trim()),
    )
}

/// Opens the bottle in progress, also before its end date.
#[flutter_rust_bridge::frb(sync)]
pub fn bottle_open_current() -> BottleActionResponse {
    bottle_open_current_at(&resolve_db_path(), &SystemClock)
}

/// Deletes a bottle and all of its notes.
#[flutter_rust_bridge::frb(sync)]
pub fn bottle_delete(bottle_id: String) -> BottleActionResponse {
    bottle_delete_at(&resolve_db_path(), &bottle_id)
}

/// Builds the home tab summary for today.
#[flutter_rust_bridge::frb(sync)]
pub fn home_summary() -> HomeSummaryResponse {
    home_summary_at(&resolve_db_path(), &SystemClock)
}

#[flutter_rust_bridge::frb(sync)]
pub fn notification_settings_get() -> NotificationSettingsResponse {
    notification_settings_get_at(&resolve_db_path())
}

/// Toggles `daily` or `reminder` notifications.
#[flutter_rust_bridge::frb(sync)]
pub fn notification_set_enabled(kind: String, enabled: bool) -> NotificationSettingsResponse {
    notification_set_enabled_at(&resolve_db_path(), &kind, enabled)
}

/// Sets the daily notification time (`HH:MM`).
#[flutter_rust_bridge::frb(sync)]
pub fn notification_set_daily_time(time: String) -> NotificationSettingsResponse {
    notification_set_daily_time_at(&resolve_db_path(), &time)
}

fn bottle_start_at(db_path: &Path, clock: &impl Clock, end_date: &str) -> BottleActionResponse {
    let end_date = match parse_date(end_date) {
        Ok(date) => date,
        Err(failure) => return BottleActionResponse::failure(failure),
    };
    match with_bottle_service(db_path, clock, |service| service.start_bottle(end_date)) {
        Ok(bottle) => BottleActionResponse::success("Bottle started.", bottle.id),
        Err(failure) => BottleActionResponse::failure(failure.context("bottle_start")),
    }
}

/// Text is stored exactly as typed; only blank text is rejected.
fn note_deposit_text_at(db_path: &Path, clock: &impl Clock, text: String) -> BottleActionResponse {
    note_deposit_at(db_path, clock, NoteContent::text(text))
}

fn note_deposit_at(db_path: &Path, clock: &impl Clock, content: NoteContent) -> BottleActionResponse {
    match with_bottle_service(db_path, clock, |service| service.deposit_note(content)) {
        Ok(note) => BottleActionResponse {
            note_id: Some(note.id.to_string()),
            ..BottleActionResponse::success("Note deposited.", note.bottle_id)
        },
        Err(failure) => BottleActionResponse::failure(failure.context("note_deposit")),
    }
}

fn bottle_open_current_at(db_path: &Path, clock: &impl Clock) -> BottleActionResponse {
    match with_bottle_service(db_path, clock, |service| service.open_current()) {
        Ok(bottle) => BottleActionResponse::success(
            format!("Bottle opened with {} note(s).", bottle.note_count()),
            bottle.id,
        ),
        Err(failure) => BottleActionResponse::failure(failure.context("bottle_open")),
    }
}

fn bottle_delete_at(db_path: &Path, bottle_id: &str) -> BottleActionResponse {
    let id: BottleId = match Uuid::parse_str(bottle_id.trim()) {
        Ok(id) => id,
        Err(_) => {
            return BottleActionResponse::failure(CallFailure::plain(format!(
                "invalid bottle id `{bottle_id}`"
            )))
        }
    };
    match with_bottle_service(db_path, &SystemClock, |service| service.delete_bottle(id)) {
        Ok(()) => BottleActionResponse::success("Bottle deleted.", id),
        Err(failure) => BottleActionResponse::failure(failure.context("bottle_delete")),
    }
}

fn home_summary_at(db_path: &Path, clock: &impl Clock) -> HomeSummaryResponse {
    let summary = open_connection(db_path).and_then(|mut conn| {
        let repo = SqliteBottleRepository::try_new(&mut conn)?;
        let summary = HomeService::new(repo, clock).summary()?;
        Ok(summary)
    });
    match summary {
        Ok(summary) => to_home_response(summary),
        Err(failure) => {
            let failure = failure.context("home_summary");
            let (notice_title, notice_message) = failure.notice_parts();
            HomeSummaryResponse {
                message: failure.message,
                notice_title,
                notice_message,
                ..HomeSummaryResponse::default()
            }
        }
    }
}

fn notification_settings_get_at(db_path: &Path) -> NotificationSettingsResponse {
    with_notification_service(db_path, |service| service.settings())
}

fn notification_set_enabled_at(
    db_path: &Path,
    kind: &str,
    enabled: bool,
) -> NotificationSettingsResponse {
    let kind = match parse_kind(kind) {
        Some(kind) => kind,
        None => {
            return NotificationSettingsResponse {
                message: format!("unknown notification kind `{kind}`; expected daily|reminder"),
                ..NotificationSettingsResponse::default()
            }
        }
    };
    with_notification_service(db_path, |service| service.set_enabled(kind, enabled))
}

fn notification_set_daily_time_at(db_path: &Path, time: &str) -> NotificationSettingsResponse {
    match NaiveTime::parse_from_str(time.trim(), TIME_FORMAT) {
        Ok(time) => with_notification_service(db_path, |service| service.set_daily_time(time)),
        Err(_) => NotificationSettingsResponse {
            message: format!("invalid time `{time}`; expected HH:MM"),
            ..NotificationSettingsResponse::default()
        },
    }
}

/// Error text plus the notice a host should present, if any.
struct CallFailure {
    message: String,
    notice: Option<UserNotice>,
}

impl CallFailure {
    fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            notice: None,
        }
    }

    fn context(self, operation: &str) -> Self {
        Self {
            message: format!("{operation} failed: {}", self.message),
            notice: self.notice,
        }
    }

    fn notice_parts(&self) -> (Option<String>, Option<String>) {
        match &self.notice {
            Some(notice) => (Some(notice.title.clone()), Some(notice.message.clone())),
            None => (None, None),
        }
    }
}

impl From<RepoError> for CallFailure {
    fn from(err: RepoError) -> Self {
        Self {
            notice: err.user_notice(),
            message: err.to_string(),
        }
    }
}

fn open_connection(db_path: &Path) -> Result<Connection, CallFailure> {
    open_db(db_path).map_err(|err| {
        warn!("event=ffi_db_open module=ffi status=error error={err}");
        CallFailure {
            message: format!("DB open failed: {err}"),
            notice: RepoError::from(err).user_notice(),
        }
    })
}

fn with_bottle_service<T, C: Clock>(
    db_path: &Path,
    clock: &C,
    f: impl FnOnce(&mut BottleService<SqliteBottleRepository<'_>, &C>) -> Result<T, RepoError>,
) -> Result<T, CallFailure> {
    let mut conn = open_connection(db_path)?;
    let repo = SqliteBottleRepository::try_new(&mut conn)?;
    let mut service = BottleService::new(repo, clock);
    Ok(f(&mut service)?)
}

fn with_notification_service(
    db_path: &Path,
    f: impl FnOnce(
        &mut NotificationService<SqliteSettingsRepository<'_>>,
    ) -> Result<NotificationSettings, RepoError>,
) -> NotificationSettingsResponse {
    let result = open_connection(db_path).and_then(|mut conn| {
        let repo = SqliteSettingsRepository::try_new(&mut conn)?;
        let mut service = NotificationService::new(repo);
        Ok(f(&mut service)?)
    });
    match result {
        Ok(settings) => NotificationSettingsResponse {
            ok: true,
            daily_enabled: settings.daily_enabled,
            daily_time: settings.daily_time.format(TIME_FORMAT).to_string(),
            reminder_enabled: settings.reminder_enabled,
            reminder_time: settings.reminder_time.format(TIME_FORMAT).to_string(),
            message: String::new(),
            notice_title: None,
            notice_message: None,
        },
        Err(failure) => {
            let failure = failure.context("notification_settings");
            let (notice_title, notice_message) = failure.notice_parts();
            NotificationSettingsResponse {
                message: failure.message,
                notice_title,
                notice_message,
                ..NotificationSettingsResponse::default()
            }
        }
    }
}

fn to_home_response(summary: HomeSummary) -> HomeSummaryResponse {
    let progress = summary.progress;
    let bottle = summary.bottle.as_ref();
    HomeSummaryResponse {
        ok: true,
        has_bottle: summary.has_bottle(),
        bottle_id: bottle.map(|bottle| bottle.id.to_string()),
        start_date: bottle.map(|bottle| bottle.start_date.format(DATE_FORMAT).to_string()),
        end_date: bottle
            .and_then(|bottle| bottle.end_date)
            .map(|date| date.format(DATE_FORMAT).to_string()),
        countdown: summary.countdown.clone(),
        is_today_end_date: summary.is_today_end_date,
        is_end_date_passed: summary.is_end_date_passed,
        has_notes: summary.has_notes,
        note_count: progress.map_or(0, |p| saturating_u32(p.deposited)),
        note_goal: progress.map_or(0, |p| saturating_u32(p.goal)),
        message: if summary.has_bottle() {
            String::new()
        } else {
            "No bottle in progress.".to_string()
        },
        notice_title: None,
        notice_message: None,
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, CallFailure> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| CallFailure::plain(format!("invalid date `{value}`; expected YYYY-MM-DD")))
}

fn parse_kind(value: &str) -> Option<NotificationKind> {
    NotificationKind::ALL
        .into_iter()
        .find(|kind| kind.label().eq_ignore_ascii_case(value.trim()))
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(happiggy_core::config::ENV_DB_PATH) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            default_db_path()
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::{
        bottle_delete_at, bottle_open_current_at, bottle_start_at, core_version, home_summary_at,
        init_logging, note_deposit_at, note_deposit_text_at, notification_set_daily_time_at,
        notification_set_enabled_at, notification_settings_get_at, ping,
    };
    use chrono::NaiveDate;
    use happiggy_core::db::open_db;
    use happiggy_core::{
        BottleRepository, FixedClock, NoteContent, SqliteBottleRepository,
    };
    use uuid::Uuid;
    use tempfile::TempDir;

    fn clock_on(y: i32, m: u32, d: u32) -> FixedClock {
        FixedClock::at_noon(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn temp_db() -> (TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("happiggy.sqlite3");
        (dir, path)
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn start_deposit_and_summary_flow() {
        let (_dir, db) = temp_db();
        let started = bottle_start_at(&db, &clock_on(2023, 1, 1), "2023-01-10");
        assert!(started.ok, "{}", started.message);

        let deposited = note_deposit_at(&db, &clock_on(2023, 1, 2), NoteContent::text("hello"));
        assert!(deposited.ok, "{}", deposited.message);
        assert_eq!(deposited.bottle_id, started.bottle_id);
        assert!(deposited.note_id.is_some());

        let summary = home_summary_at(&db, &clock_on(2023, 1, 5));
        assert!(summary.ok, "{}", summary.message);
        assert!(summary.has_bottle);
        assert_eq!(summary.countdown.as_deref(), Some("D-5"));
        assert_eq!(summary.start_date.as_deref(), Some("2023-01-01"));
        assert_eq!(summary.end_date.as_deref(), Some("2023-01-10"));
        assert_eq!((summary.note_count, summary.note_goal), (1, 10));
        assert!(summary.has_notes);
    }

    #[test]
    fn second_start_and_bad_dates_fail_without_notice() {
        let (_dir, db) = temp_db();
        assert!(bottle_start_at(&db, &clock_on(2023, 1, 1), "2023-01-10").ok);

        let second = bottle_start_at(&db, &clock_on(2023, 1, 1), "2023-02-10");
        assert!(!second.ok);
        assert!(second.message.contains("in progress"));
        assert_eq!(second.notice_title, None);

        let malformed = bottle_start_at(&db, &clock_on(2023, 1, 1), "10/01/2023");
        assert!(!malformed.ok);
        assert!(malformed.message.contains("YYYY-MM-DD"));
    }

    #[test]
    fn open_then_deposit_is_rejected() {
        let (_dir, db) = temp_db();
        assert!(bottle_start_at(&db, &clock_on(2023, 1, 1), "2023-01-10").ok);

        let opened = bottle_open_current_at(&db, &clock_on(2023, 1, 3));
        assert!(opened.ok, "{}", opened.message);

        let late = note_deposit_at(&db, &clock_on(2023, 1, 3), NoteContent::text("late"));
        assert!(!late.ok);

        let summary = home_summary_at(&db, &clock_on(2023, 1, 3));
        assert!(summary.ok);
        assert!(!summary.has_bottle);
        assert_eq!(summary.countdown, None);
    }

    #[test]
    fn delete_validates_id_and_removes_bottle() {
        let (_dir, db) = temp_db();
        let started = bottle_start_at(&db, &clock_on(2023, 1, 1), "2023-01-10");
        let bottle_id = started.bottle_id.unwrap();

        assert!(!bottle_delete_at(&db, "not-a-uuid").ok);
        assert!(bottle_delete_at(&db, &bottle_id).ok);
        assert!(!bottle_delete_at(&db, &bottle_id).ok);
    }

    #[test]
    fn unreadable_database_surfaces_a_notice() {
        let (dir, _) = temp_db();
        // A directory cannot be opened as a database file.
        let summary = home_summary_at(dir.path(), &clock_on(2023, 1, 1));
        assert!(!summary.ok);
        assert!(summary.notice_title.is_some());
        assert!(summary.notice_message.is_some());

        let settings = notification_settings_get_at(dir.path());
        assert!(!settings.ok);
        assert!(settings.notice_title.is_some());
        assert!(settings.notice_message.is_some());

        let toggled = notification_set_enabled_at(dir.path(), "daily", true);
        assert!(!toggled.ok);
        assert_eq!(toggled.notice_title, settings.notice_title);
    }

    #[test]
    fn invalid_notification_input_has_no_notice() {
        let (_dir, db) = temp_db();
        let unknown = notification_set_enabled_at(&db, "weekly", true);
        assert!(!unknown.ok);
        assert_eq!(unknown.notice_title, None);
    }

    #[test]
    fn text_note_keeps_surrounding_whitespace() {
        let (_dir, db) = temp_db();
        let started = bottle_start_at(&db, &clock_on(2023, 1, 1), "2023-01-10");
        let typed = "  dear future me,\n  see you soon  ";
        let deposited = note_deposit_text_at(&db, &clock_on(2023, 1, 2), typed.to_string());
        assert!(deposited.ok, "{}", deposited.message);

        let blank = note_deposit_text_at(&db, &clock_on(2023, 1, 2), " \n ".to_string());
        assert!(!blank.ok);

        let bottle_id = Uuid::parse_str(&started.bottle_id.unwrap()).unwrap();
        let mut conn = open_db(&db).unwrap();
        let repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
        let bottle = repo.get_bottle(bottle_id).unwrap().unwrap();
        assert_eq!(bottle.note_count(), 1);
        assert_eq!(bottle.notes[0].content, NoteContent::text(typed));
    }

    #[test]
    fn notification_settings_roundtrip_through_ffi() {
        let (_dir, db) = temp_db();
        let enabled = notification_set_enabled_at(&db, "Daily", true);
        assert!(enabled.ok, "{}", enabled.message);
        assert!(enabled.daily_enabled);

        let timed = notification_set_daily_time_at(&db, "07:30");
        assert!(timed.ok, "{}", timed.message);
        assert_eq!(timed.daily_time, "07:30");
        assert!(timed.daily_enabled);

        assert!(!notification_set_enabled_at(&db, "weekly", true).ok);
        assert!(!notification_set_daily_time_at(&db, "7pm").ok);
    }
}
