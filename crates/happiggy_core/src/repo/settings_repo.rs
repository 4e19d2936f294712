//! Key/value settings repository.
//!
//! # Invariants
//! - Missing keys fall back to `NotificationSettings::default()` values.
//! - Unparseable stored values are reported, never silently replaced.
//! - A save writes every notification key in one transaction.

use super::{ensure_tables, RepoError, RepoResult, StorageContext};
use crate::model::notification::NotificationSettings;
use chrono::NaiveTime;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

const KEY_DAILY_ENABLED: &str = "notification.daily.enabled";
const KEY_DAILY_TIME: &str = "notification.daily.time";
const KEY_REMINDER_ENABLED: &str = "notification.reminder.enabled";
const KEY_REMINDER_TIME: &str = "notification.reminder.time";
const TIME_FORMAT: &str = "%H:%M";

/// Repository interface for app-level preferences.
pub trait SettingsRepository {
    fn load_notification_settings(&self) -> RepoResult<NotificationSettings>;
    fn save_notification_settings(&mut self, settings: &NotificationSettings) -> RepoResult<()>;
}

/// SQLite-backed settings repository over the `app_settings` table.
pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["app_settings"])?;
        Ok(Self { conn })
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn load_notification_settings(&self) -> RepoResult<NotificationSettings> {
        let defaults = NotificationSettings::default();
        Ok(NotificationSettings {
            daily_enabled: read_value(self.conn, KEY_DAILY_ENABLED, parse_bool)?
                .unwrap_or(defaults.daily_enabled),
            daily_time: read_value(self.conn, KEY_DAILY_TIME, parse_time)?
                .unwrap_or(defaults.daily_time),
            reminder_enabled: read_value(self.conn, KEY_REMINDER_ENABLED, parse_bool)?
                .unwrap_or(defaults.reminder_enabled),
            reminder_time: read_value(self.conn, KEY_REMINDER_TIME, parse_time)?
                .unwrap_or(defaults.reminder_time),
        })
    }

    fn save_notification_settings(&mut self, settings: &NotificationSettings) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .storage_context("Couldn't save notification settings.")?;
        let entries = [
            (KEY_DAILY_ENABLED, settings.daily_enabled.to_string()),
            (
                KEY_DAILY_TIME,
                settings.daily_time.format(TIME_FORMAT).to_string(),
            ),
            (KEY_REMINDER_ENABLED, settings.reminder_enabled.to_string()),
            (
                KEY_REMINDER_TIME,
                settings.reminder_time.format(TIME_FORMAT).to_string(),
            ),
        ];
        for (key, value) in &entries {
            tx.execute(
                "INSERT INTO app_settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![key, value],
            )
            .storage_context("Couldn't save notification settings.")?;
        }
        tx.commit()
            .storage_context("Couldn't save notification settings.")?;

        info!(
            "event=settings_save module=repo status=ok daily_enabled={} reminder_enabled={}",
            settings.daily_enabled, settings.reminder_enabled
        );
        Ok(())
    }
}

fn read_value<T>(
    conn: &Connection,
    key: &str,
    parse: fn(&str) -> Option<T>,
) -> RepoResult<Option<T>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM app_settings WHERE key = ?1;",
            [key],
            |row| row.get(0),
        )
        .optional()
        .storage_context("Couldn't load settings.")?;

    raw.map(|value| {
        parse(value.trim()).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid value `{value}` for setting `{key}`"))
        })
    })
    .transpose()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).ok()
}
