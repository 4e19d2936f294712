//! Bottle/note repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Load and persist bottles together with the notes they own.
//! - Assign note positions atomically at deposit time.
//!
//! # Invariants
//! - Mutations run in `IMMEDIATE` transactions (single writer).
//! - At most one unopened bottle exists; a partial unique index backs the
//!   explicit check in `save`.
//! - Notes are always returned ordered by `sequence_index ASC`.
//! - Deleting a bottle deletes its notes (`ON DELETE CASCADE`).

use super::{ensure_tables, RepoError, RepoResult, StorageContext};
use crate::model::bottle::{Bottle, BottleId};
use crate::model::error::InvalidOperationError;
use crate::model::note::{Note, NoteContent, NoteDraft};
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior,
};
use uuid::Uuid;

const BOTTLE_SELECT_SQL: &str = "SELECT
    uuid,
    start_date,
    end_date,
    is_opened
FROM bottles";

const BOTTLE_ORDER_SQL: &str = " ORDER BY start_date DESC, created_at DESC, uuid ASC";

/// Query options for bottle history listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BottleListQuery {
    /// `Some(true)`: opened only; `Some(false)`: in progress only.
    pub opened: Option<bool>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for bottle/note persistence.
pub trait BottleRepository {
    /// Returns the bottle still in progress, if any.
    ///
    /// When storage somehow holds several, the most recently started wins.
    fn current_bottle(&self) -> RepoResult<Option<Bottle>>;
    fn get_bottle(&self, id: BottleId) -> RepoResult<Option<Bottle>>;
    fn list_bottles(&self, query: &BottleListQuery) -> RepoResult<Vec<Bottle>>;
    /// Inserts a new bottle with its notes, or applies the allowed changes
    /// (opening, appended notes) to an existing one.
    ///
    /// The caller's notes must start with exactly the stored ones; otherwise
    /// `InvalidOperationError::StaleBottle` is returned and nothing changes.
    fn save(&mut self, bottle: &Bottle) -> RepoResult<()>;
    /// Deposits one note at position `note_count + 1`.
    fn add_note(&mut self, bottle_id: BottleId, draft: &NoteDraft) -> RepoResult<Note>;
    fn open_bottle(&mut self, id: BottleId) -> RepoResult<()>;
    fn delete_bottle(&mut self, id: BottleId) -> RepoResult<()>;
    /// Deletes every bottle and note; returns the number of bottles removed.
    fn delete_all(&mut self) -> RepoResult<usize>;
}

/// SQLite-backed bottle repository.
pub struct SqliteBottleRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteBottleRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["bottles", "notes"])?;
        Ok(Self { conn })
    }
}

#[derive(Debug, Clone, Copy)]
struct StoredBottleState {
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    is_opened: bool,
    note_count: u32,
}

impl BottleRepository for SqliteBottleRepository<'_> {
    fn current_bottle(&self) -> RepoResult<Option<Bottle>> {
        let sql = format!("{BOTTLE_SELECT_SQL} WHERE is_opened = 0{BOTTLE_ORDER_SQL} LIMIT 1;");
        let bottle = self
            .conn
            .query_row(&sql, [], |row| Ok(read_bottle_row(row)))
            .optional()
            .storage_context("Couldn't load the current bottle.")?
            .transpose()?;
        bottle
            .map(|bottle| attach_notes(self.conn, bottle))
            .transpose()
    }

    fn get_bottle(&self, id: BottleId) -> RepoResult<Option<Bottle>> {
        let sql = format!("{BOTTLE_SELECT_SQL} WHERE uuid = ?1;");
        let bottle = self
            .conn
            .query_row(&sql, [id.to_string()], |row| Ok(read_bottle_row(row)))
            .optional()
            .storage_context("Couldn't load the bottle.")?
            .transpose()?;
        bottle
            .map(|bottle| attach_notes(self.conn, bottle))
            .transpose()
    }

    fn list_bottles(&self, query: &BottleListQuery) -> RepoResult<Vec<Bottle>> {
        let mut sql = format!("{BOTTLE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(opened) = query.opened {
            sql.push_str(" AND is_opened = ?");
            bind_values.push(Value::Integer(bool_to_int(opened)));
        }
        sql.push_str(BOTTLE_ORDER_SQL);
        match query.limit {
            Some(limit) => {
                sql.push_str(" LIMIT ?");
                bind_values.push(Value::Integer(i64::from(limit)));
            }
            None if query.offset > 0 => sql.push_str(" LIMIT -1"),
            None => {}
        }
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self
            .conn
            .prepare(&sql)
            .storage_context("Couldn't load saved bottles.")?;
        let mut rows = stmt
            .query(params_from_iter(bind_values))
            .storage_context("Couldn't load saved bottles.")?;
        let mut bottles = Vec::new();
        while let Some(row) = rows.next()? {
            bottles.push(read_bottle_row(row)?);
        }
        drop(rows);

        bottles
            .into_iter()
            .map(|bottle| attach_notes(self.conn, bottle))
            .collect()
    }

    fn save(&mut self, bottle: &Bottle) -> RepoResult<()> {
        bottle.validate()?;
        let id_text = bottle.id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .storage_context("Couldn't save the bottle.")?;

        match load_stored_state(&tx, &id_text)? {
            None => {
                if !bottle.is_opened {
                    if let Some(active) = active_bottle_id(&tx)? {
                        return Err(InvalidOperationError::ActiveBottleExists(active).into());
                    }
                }
                tx.execute(
                    "INSERT INTO bottles (uuid, start_date, end_date, is_opened, opened_at)
                     VALUES (?1, ?2, ?3, ?4, CASE WHEN ?4 = 1 THEN (strftime('%s', 'now') * 1000) END);",
                    params![
                        id_text,
                        bottle.start_date,
                        bottle.end_date,
                        bool_to_int(bottle.is_opened),
                    ],
                )
                .storage_context("Couldn't save the bottle.")?;
                for note in &bottle.notes {
                    insert_note(&tx, note)?;
                }
            }
            Some(stored) => {
                if stored.start_date != bottle.start_date || stored.end_date != bottle.end_date {
                    return Err(InvalidOperationError::DatesImmutable(bottle.id).into());
                }
                if stored.is_opened && !bottle.is_opened {
                    return Err(InvalidOperationError::CannotReopen(bottle.id).into());
                }
                let stored_ids = load_note_ids(&tx, &id_text)?;
                let known = bottle.notes.get(..stored_ids.len()).ok_or(
                    InvalidOperationError::StaleBottle(bottle.id),
                )?;
                if known.iter().map(|note| note.id).ne(stored_ids.iter().copied()) {
                    return Err(InvalidOperationError::StaleBottle(bottle.id).into());
                }
                let appended = &bottle.notes[stored_ids.len()..];
                if stored.is_opened && !appended.is_empty() {
                    return Err(InvalidOperationError::BottleAlreadyOpened(bottle.id).into());
                }
                for note in appended {
                    insert_note(&tx, note)?;
                }
                if bottle.is_opened && !stored.is_opened {
                    mark_opened(&tx, &id_text)?;
                }
            }
        }

        tx.commit().storage_context("Couldn't save the bottle.")?;
        info!(
            "event=bottle_save module=repo status=ok notes={} opened={}",
            bottle.note_count(),
            bottle.is_opened
        );
        Ok(())
    }

    fn add_note(&mut self, bottle_id: BottleId, draft: &NoteDraft) -> RepoResult<Note> {
        let id_text = bottle_id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .storage_context("Couldn't save the note.")?;

        let stored = load_stored_state(&tx, &id_text)?.ok_or(RepoError::NotFound(bottle_id))?;
        if stored.is_opened {
            return Err(InvalidOperationError::BottleAlreadyOpened(bottle_id).into());
        }

        let note = Note::new(bottle_id, stored.note_count + 1, draft.clone())?;
        insert_note(&tx, &note)?;
        tx.commit().storage_context("Couldn't save the note.")?;

        info!(
            "event=note_deposit module=repo status=ok kind={} sequence_index={}",
            note.content.kind_label(),
            note.sequence_index
        );
        Ok(note)
    }

    fn open_bottle(&mut self, id: BottleId) -> RepoResult<()> {
        let id_text = id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .storage_context("Couldn't open the bottle.")?;

        let stored = load_stored_state(&tx, &id_text)?.ok_or(RepoError::NotFound(id))?;
        if stored.is_opened {
            return Err(InvalidOperationError::BottleAlreadyOpened(id).into());
        }
        mark_opened(&tx, &id_text)?;
        tx.commit().storage_context("Couldn't open the bottle.")?;

        info!(
            "event=bottle_open module=repo status=ok notes={}",
            stored.note_count
        );
        Ok(())
    }

    fn delete_bottle(&mut self, id: BottleId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM bottles WHERE uuid = ?1;", [id.to_string()])
            .storage_context("Couldn't delete the bottle.")?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        info!("event=bottle_delete module=repo status=ok");
        Ok(())
    }

    fn delete_all(&mut self) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM bottles;", [])
            .storage_context("Couldn't delete saved bottles.")?;
        info!("event=bottle_delete_all module=repo status=ok removed={removed}");
        Ok(removed)
    }
}

fn read_bottle_row(row: &Row<'_>) -> RepoResult<Bottle> {
    let uuid_text: String = row.get("uuid")?;
    let is_opened = int_to_bool(row.get("is_opened")?, "bottles.is_opened")?;
    Ok(Bottle {
        id: parse_uuid(&uuid_text, "bottles.uuid")?,
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        notes: Vec::new(),
        is_opened,
    })
}

fn attach_notes(conn: &Connection, mut bottle: Bottle) -> RepoResult<Bottle> {
    bottle.notes = load_notes(conn, bottle.id)?;
    bottle
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("bottle {}: {err}", bottle.id)))?;
    Ok(bottle)
}

fn load_notes(conn: &Connection, bottle_id: BottleId) -> RepoResult<Vec<Note>> {
    let mut stmt = conn
        .prepare(
            "SELECT
                uuid,
                content_kind,
                content,
                sequence_index,
                created_at
             FROM notes
             WHERE bottle_uuid = ?1
             ORDER BY sequence_index ASC;",
        )
        .storage_context("Couldn't load notes.")?;
    let mut rows = stmt
        .query([bottle_id.to_string()])
        .storage_context("Couldn't load notes.")?;

    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get("uuid")?;
        let kind: String = row.get("content_kind")?;
        let content = NoteContent::from_parts(&kind, row.get("content")?).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid content kind `{kind}` in notes.content_kind"))
        })?;
        let created_at_ms: i64 = row.get("created_at")?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(created_at_ms).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid timestamp `{created_at_ms}` in notes.created_at"
            ))
        })?;
        notes.push(Note {
            id: parse_uuid(&uuid_text, "notes.uuid")?,
            bottle_id,
            created_at,
            content,
            sequence_index: row.get("sequence_index")?,
        });
    }
    Ok(notes)
}

fn insert_note(conn: &Connection, note: &Note) -> RepoResult<()> {
    note.validate()?;
    conn.execute(
        "INSERT INTO notes (uuid, bottle_uuid, content_kind, content, sequence_index, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            note.id.to_string(),
            note.bottle_id.to_string(),
            note.content.kind_label(),
            note.content.as_str(),
            note.sequence_index,
            note.created_at.timestamp_millis(),
        ],
    )
    .storage_context("Couldn't save the note.")?;
    Ok(())
}

fn load_stored_state(conn: &Connection, id_text: &str) -> RepoResult<Option<StoredBottleState>> {
    let state = conn
        .query_row(
            "SELECT
                b.start_date,
                b.end_date,
                b.is_opened,
                (SELECT COUNT(*) FROM notes n WHERE n.bottle_uuid = b.uuid) AS note_count
             FROM bottles b
             WHERE b.uuid = ?1;",
            [id_text],
            |row| {
                Ok((
                    row.get::<_, NaiveDate>("start_date")?,
                    row.get::<_, Option<NaiveDate>>("end_date")?,
                    row.get::<_, i64>("is_opened")?,
                    row.get::<_, u32>("note_count")?,
                ))
            },
        )
        .optional()
        .storage_context("Couldn't load the bottle.")?;

    state
        .map(|(start_date, end_date, is_opened, note_count)| {
            Ok(StoredBottleState {
                start_date,
                end_date,
                is_opened: int_to_bool(is_opened, "bottles.is_opened")?,
                note_count,
            })
        })
        .transpose()
}

/// Stored note ids of one bottle in `sequence_index` order.
fn load_note_ids(conn: &Connection, id_text: &str) -> RepoResult<Vec<Uuid>> {
    let mut stmt = conn
        .prepare("SELECT uuid FROM notes WHERE bottle_uuid = ?1 ORDER BY sequence_index ASC;")
        .storage_context("Couldn't load notes.")?;
    let mut rows = stmt
        .query([id_text])
        .storage_context("Couldn't load notes.")?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let text: String = row.get(0)?;
        ids.push(parse_uuid(&text, "notes.uuid")?);
    }
    Ok(ids)
}

fn active_bottle_id(conn: &Connection) -> RepoResult<Option<BottleId>> {
    let id_text: Option<String> = conn
        .query_row(
            "SELECT uuid FROM bottles WHERE is_opened = 0 LIMIT 1;",
            [],
            |row| row.get(0),
        )
        .optional()
        .storage_context("Couldn't load the current bottle.")?;
    id_text
        .map(|text| parse_uuid(&text, "bottles.uuid"))
        .transpose()
}

fn mark_opened(conn: &Connection, id_text: &str) -> RepoResult<()> {
    conn.execute(
        "UPDATE bottles
         SET
            is_opened = 1,
            opened_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?1
           AND is_opened = 0;",
        [id_text],
    )
    .storage_context("Couldn't open the bottle.")?;
    Ok(())
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    i64::from(value)
}
