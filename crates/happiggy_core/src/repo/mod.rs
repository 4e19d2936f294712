//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate domain records before any SQL mutation.
//! - Storage failures surface as `PersistenceError` with a readable message;
//!   they never abort the process.

use crate::db::DbError;
use crate::model::bottle::BottleId;
use crate::model::error::{DomainError, InvalidOperationError, ValidationError};
use log::warn;
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

pub mod bottle_repo;
pub mod settings_repo;

pub type RepoResult<T> = Result<T, RepoError>;

const STORAGE_NOTICE_TITLE: &str = "Something went wrong";

/// Storage failure with a human-readable description of the attempted work.
#[derive(Debug, Error)]
#[error("{message}: {source}")]
pub struct PersistenceError {
    message: String,
    #[source]
    source: DbError,
}

impl PersistenceError {
    pub fn new(message: impl Into<String>, source: impl Into<DbError>) -> Self {
        Self {
            message: message.into(),
            source: source.into(),
        }
    }

    /// What the repository was doing, phrased for end users.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Description of the underlying storage failure.
    pub fn cause_description(&self) -> String {
        self.source.to_string()
    }
}

/// Repository error for bottle/note/settings persistence.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    InvalidOperation(#[from] InvalidOperationError),
    #[error("bottle not found: {0}")]
    NotFound(BottleId),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("repository requires table `{0}`")]
    MissingRequiredTable(&'static str),
}

impl From<DomainError> for RepoError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(err) => Self::Validation(err),
            DomainError::InvalidOperation(err) => Self::InvalidOperation(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Persistence(PersistenceError::new("Couldn't access saved data.", value))
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(DbError::Sqlite(value))
    }
}

/// Dismissible notice a host shows instead of crashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserNotice {
    pub title: String,
    pub message: String,
}

impl RepoError {
    /// Notice for failures the user should be told about.
    ///
    /// Storage and corrupted-data failures get a notice; rule violations are
    /// returned to the caller to handle inline.
    pub fn user_notice(&self) -> Option<UserNotice> {
        match self {
            Self::Persistence(err) => Some(UserNotice {
                title: STORAGE_NOTICE_TITLE.to_string(),
                message: err.message().to_string(),
            }),
            Self::InvalidData(_) | Self::MissingRequiredTable(_) => Some(UserNotice {
                title: STORAGE_NOTICE_TITLE.to_string(),
                message: "Saved data could not be read.".to_string(),
            }),
            Self::Validation(_) | Self::InvalidOperation(_) | Self::NotFound(_) => None,
        }
    }
}

/// Attaches a user-facing description to storage failures.
pub(crate) trait StorageContext<T> {
    fn storage_context(self, message: &str) -> RepoResult<T>;
}

impl<T, E: Into<DbError>> StorageContext<T> for Result<T, E> {
    fn storage_context(self, message: &str) -> RepoResult<T> {
        self.map_err(|err| {
            let err = PersistenceError::new(message, err);
            warn!(
                "event=storage_failure module=repo status=error message=\"{}\" cause={}",
                err.message(),
                err.cause_description()
            );
            RepoError::Persistence(err)
        })
    }
}

pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
