use chrono::{NaiveDate, TimeZone, Utc};
use happiggy_core::db::open_db_in_memory;
use happiggy_core::{
    Bottle, BottleListQuery, BottleRepository, InvalidOperationError, NoteContent, NoteDraft,
    RepoError, SqliteBottleRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn text_draft(text: &str) -> NoteDraft {
    NoteDraft::new(
        NoteContent::text(text),
        Utc.with_ymd_and_hms(2023, 1, 3, 21, 15, 0).unwrap(),
    )
}

fn note_rows_of(repo: &SqliteBottleRepository<'_>, id: Uuid) -> usize {
    repo.get_bottle(id).unwrap().unwrap().note_count()
}

fn note_rows(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))
        .unwrap()
}

#[test]
fn current_bottle_is_none_on_empty_storage() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
    assert!(repo.current_bottle().unwrap().is_none());
}

#[test]
fn saved_bottle_is_current_until_opened() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();

    let bottle = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
    repo.save(&bottle).unwrap();

    let current = repo.current_bottle().unwrap().unwrap();
    assert_eq!(current, bottle);

    repo.open_bottle(bottle.id).unwrap();
    assert!(repo.current_bottle().unwrap().is_none());
    let opened = repo.get_bottle(bottle.id).unwrap().unwrap();
    assert!(opened.is_opened);
}

#[test]
fn add_note_assigns_positions_and_preserves_content() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
    let bottle = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
    repo.save(&bottle).unwrap();

    let first = repo.add_note(bottle.id, &text_draft("first")).unwrap();
    let photo = NoteDraft::new(NoteContent::image("photos/cake.jpg"), Utc::now());
    let second = repo.add_note(bottle.id, &photo).unwrap();
    assert_eq!(first.sequence_index, 1);
    assert_eq!(second.sequence_index, 2);

    let loaded = repo.current_bottle().unwrap().unwrap();
    assert!(loaded.has_notes());
    assert_eq!(loaded.notes.len(), 2);
    assert_eq!(loaded.notes[0], first);
    assert_eq!(loaded.notes[1].content, NoteContent::image("photos/cake.jpg"));
}

#[test]
fn add_note_to_opened_bottle_is_rejected_and_sequence_unchanged() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
        let bottle = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
        repo.save(&bottle).unwrap();
        repo.add_note(bottle.id, &text_draft("only")).unwrap();
        repo.open_bottle(bottle.id).unwrap();

        let err = repo.add_note(bottle.id, &text_draft("late")).unwrap_err();
        assert!(matches!(
            err,
            RepoError::InvalidOperation(InvalidOperationError::BottleAlreadyOpened(id)) if id == bottle.id
        ));

        let reloaded = repo.get_bottle(bottle.id).unwrap().unwrap();
        assert_eq!(reloaded.notes.len(), 1);
        assert_eq!(reloaded.notes[0].sequence_index, 1);
    }
    assert_eq!(note_rows(&conn), 1);
}

#[test]
fn add_note_to_unknown_bottle_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
    let missing = Uuid::new_v4();
    let err = repo.add_note(missing, &text_draft("lost")).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

#[test]
fn second_active_bottle_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
    let first = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
    repo.save(&first).unwrap();

    let second = Bottle::new(day(2023, 1, 2), day(2023, 2, 1)).unwrap();
    let err = repo.save(&second).unwrap_err();
    assert!(matches!(
        err,
        RepoError::InvalidOperation(InvalidOperationError::ActiveBottleExists(id)) if id == first.id
    ));

    repo.open_bottle(first.id).unwrap();
    repo.save(&second).unwrap();
    assert_eq!(repo.current_bottle().unwrap().unwrap().id, second.id);
}

#[test]
fn save_applies_open_and_appended_notes_to_existing_bottle() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
    let mut bottle = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
    bottle.deposit(text_draft("stored with bottle")).unwrap();
    repo.save(&bottle).unwrap();

    bottle.deposit(text_draft("appended later")).unwrap();
    bottle.open().unwrap();
    repo.save(&bottle).unwrap();

    let loaded = repo.get_bottle(bottle.id).unwrap().unwrap();
    assert_eq!(loaded, bottle);
}

#[test]
fn save_rejects_date_changes_and_reclosing() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
    let bottle = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
    repo.save(&bottle).unwrap();

    let mut moved = bottle.clone();
    moved.end_date = Some(day(2023, 1, 20));
    assert!(matches!(
        repo.save(&moved).unwrap_err(),
        RepoError::InvalidOperation(InvalidOperationError::DatesImmutable(_))
    ));

    repo.open_bottle(bottle.id).unwrap();
    assert!(matches!(
        repo.save(&bottle).unwrap_err(),
        RepoError::InvalidOperation(InvalidOperationError::CannotReopen(_))
    ));
}

#[test]
fn save_rejects_stale_copy_instead_of_dropping_its_note() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
    let bottle = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
    repo.save(&bottle).unwrap();

    let mut stale = repo.get_bottle(bottle.id).unwrap().unwrap();
    repo.add_note(bottle.id, &text_draft("from elsewhere")).unwrap();
    stale.deposit(text_draft("mine")).unwrap();

    assert!(matches!(
        repo.save(&stale).unwrap_err(),
        RepoError::InvalidOperation(InvalidOperationError::StaleBottle(_))
    ));

    let stored = repo.get_bottle(bottle.id).unwrap().unwrap();
    assert_eq!(stored.note_count(), 1);
    assert_eq!(stored.notes[0].content, NoteContent::text("from elsewhere"));

    let mut fresh = stored.clone();
    fresh.deposit(text_draft("mine")).unwrap();
    repo.save(&fresh).unwrap();
    assert_eq!(repo.get_bottle(bottle.id).unwrap().unwrap().note_count(), 2);
}

#[test]
fn save_rejects_copy_with_fewer_notes_than_storage() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
    let bottle = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
    repo.save(&bottle).unwrap();
    repo.add_note(bottle.id, &text_draft("first")).unwrap();

    let mut opened = bottle.clone();
    opened.open().unwrap();
    assert!(matches!(
        repo.save(&opened).unwrap_err(),
        RepoError::InvalidOperation(InvalidOperationError::StaleBottle(_))
    ));
    assert!(repo.current_bottle().unwrap().is_some());
    assert_eq!(note_rows_of(&repo, bottle.id), 1);
}

#[test]
fn save_rejects_invalid_bottle_before_sql() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
    let mut bottle = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
    bottle.end_date = None;

    assert!(matches!(
        repo.save(&bottle).unwrap_err(),
        RepoError::Validation(_)
    ));
    assert!(repo.current_bottle().unwrap().is_none());
}

#[test]
fn open_twice_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
    let bottle = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
    repo.save(&bottle).unwrap();

    repo.open_bottle(bottle.id).unwrap();
    assert!(matches!(
        repo.open_bottle(bottle.id).unwrap_err(),
        RepoError::InvalidOperation(InvalidOperationError::BottleAlreadyOpened(_))
    ));
}

#[test]
fn delete_bottle_cascades_to_notes() {
    let mut conn = open_db_in_memory().unwrap();
    {
        let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
        let bottle = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
        repo.save(&bottle).unwrap();
        repo.add_note(bottle.id, &text_draft("a")).unwrap();
        repo.add_note(bottle.id, &text_draft("b")).unwrap();

        repo.delete_bottle(bottle.id).unwrap();
        assert!(repo.get_bottle(bottle.id).unwrap().is_none());
        assert!(matches!(
            repo.delete_bottle(bottle.id).unwrap_err(),
            RepoError::NotFound(_)
        ));
    }
    assert_eq!(note_rows(&conn), 0);
}

#[test]
fn list_bottles_filters_history_and_delete_all_clears_everything() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();

    let older = Bottle::new(day(2022, 1, 1), day(2022, 2, 1)).unwrap();
    repo.save(&older).unwrap();
    repo.open_bottle(older.id).unwrap();
    let newer = Bottle::new(day(2022, 6, 1), day(2022, 7, 1)).unwrap();
    repo.save(&newer).unwrap();
    repo.open_bottle(newer.id).unwrap();
    let active = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
    repo.save(&active).unwrap();

    let history = repo
        .list_bottles(&BottleListQuery {
            opened: Some(true),
            ..BottleListQuery::default()
        })
        .unwrap();
    let ids: Vec<_> = history.iter().map(|bottle| bottle.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);

    let page = repo
        .list_bottles(&BottleListQuery {
            opened: None,
            limit: Some(1),
            offset: 1,
        })
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, newer.id);

    assert_eq!(repo.delete_all().unwrap(), 3);
    assert!(repo.list_bottles(&BottleListQuery::default()).unwrap().is_empty());
}

#[test]
fn corrupted_rows_are_reported_as_invalid_data() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO bottles (uuid, start_date, end_date, is_opened) VALUES ('not-a-uuid', '2023-01-01', '2023-01-02', 0);",
        [],
    )
    .unwrap();

    let repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
    let err = repo.current_bottle().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert!(err.user_notice().is_some());
}

#[test]
fn missing_table_is_reported_on_construction() {
    let mut conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP TABLE notes;").unwrap();

    let err = SqliteBottleRepository::try_new(&mut conn).err().unwrap();
    assert!(matches!(err, RepoError::MissingRequiredTable("notes")));
}

#[test]
fn persistence_failures_carry_message_cause_and_notice() {
    let mut conn = open_db_in_memory().unwrap();
    let bottle = Bottle::new(day(2023, 1, 1), day(2023, 1, 10)).unwrap();
    {
        let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
        repo.save(&bottle).unwrap();
    }

    // Swap in a notes table the insert statement cannot satisfy.
    conn.execute_batch(
        "DROP TABLE notes;
         CREATE TABLE notes (uuid TEXT PRIMARY KEY NOT NULL, bottle_uuid TEXT NOT NULL);",
    )
    .unwrap();

    let mut repo = SqliteBottleRepository::try_new(&mut conn).unwrap();
    let err = repo.add_note(bottle.id, &text_draft("x")).unwrap_err();
    match &err {
        RepoError::Persistence(persistence) => {
            assert_eq!(persistence.message(), "Couldn't save the note.");
            assert!(!persistence.cause_description().is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
    let notice = err.user_notice().unwrap();
    assert_eq!(notice.message, "Couldn't save the note.");
}
