//! SQLite-backed `NoteStore`.
//!
//! # Invariants
//! - `updated_at` strictly increases per note across updates, even within
//!   one millisecond, so list order always reflects the latest write.
//! - Content is stored as the raw document JSON.

use super::{NoteStore, NoteUpdate, StoreError, StoreResult};
use crate::codec::{to_raw, RawDocument};
use crate::db::{open_db, open_db_in_memory};
use crate::model::document::Document;
use crate::model::note::{Note, NoteId, NoteSummary, OwnerId, ProjectId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const DEFAULT_NAME_PREFIX: &str = "Note #";

/// Note store owning one migrated SQLite connection.
pub struct SqliteNoteStore {
    conn: Connection,
}

impl SqliteNoteStore {
    /// Wraps a migrated connection.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        if !table_exists(&conn, "notes")? {
            return Err(StoreError::InvalidData(
                "missing required table `notes`".to_string(),
            ));
        }
        Ok(Self { conn })
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Total notes across all projects.
    pub fn note_count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn load(&self, note_id: NoteId) -> StoreResult<Note> {
        let row = self
            .conn
            .query_row(
                "SELECT id, project_id, owner_id, name, content, updated_at
                 FROM notes
                 WHERE id = ?1;",
                [note_id.to_string()],
                StoredNote::from_row,
            )
            .optional()?;
        match row {
            Some(stored) => stored.into_note(),
            None => Err(StoreError::NotFound(note_id)),
        }
    }
}

impl NoteStore for SqliteNoteStore {
    fn list_notes(&self, project_id: ProjectId) -> StoreResult<Vec<NoteSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, updated_at
             FROM notes
             WHERE project_id = ?1
             ORDER BY updated_at DESC, rowid DESC;",
        )?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            notes.push(NoteSummary {
                id: parse_uuid(&id, "id")?,
                name: row.get("name")?,
                updated_at: row.get("updated_at")?,
            });
        }
        Ok(notes)
    }

    fn get_note_content(&self, note_id: NoteId) -> StoreResult<Note> {
        self.load(note_id)
    }

    fn create_note(&self, owner_id: OwnerId, project_id: ProjectId) -> StoreResult<Note> {
        let note = Note {
            id: Uuid::new_v4(),
            project_id,
            owner_id,
            name: format!("{DEFAULT_NAME_PREFIX}{}", self.note_count()? + 1),
            content: to_raw(&Document::empty()),
            updated_at: now_epoch_ms(),
        };
        self.conn.execute(
            "INSERT INTO notes (id, project_id, owner_id, name, content, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                note.id.to_string(),
                note.project_id.to_string(),
                note.owner_id.to_string(),
                note.name,
                encode_content(&note.content)?,
                note.updated_at,
            ],
        )?;
        Ok(note)
    }

    fn update_note(&self, note_id: NoteId, update: &NoteUpdate) -> StoreResult<Note> {
        let content = update.content.as_ref().map(encode_content).transpose()?;
        let changed = self.conn.execute(
            "UPDATE notes
             SET
                name = COALESCE(?2, name),
                content = COALESCE(?3, content),
                updated_at = MAX(?4, updated_at + 1)
             WHERE id = ?1;",
            params![note_id.to_string(), update.name, content, now_epoch_ms()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(note_id));
        }
        self.load(note_id)
    }

    fn delete_note(&self, note_id: NoteId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1;", [note_id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(note_id));
        }
        Ok(())
    }
}

struct StoredNote {
    id: String,
    project_id: String,
    owner_id: String,
    name: String,
    content: String,
    updated_at: i64,
}

impl StoredNote {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            project_id: row.get("project_id")?,
            owner_id: row.get("owner_id")?,
            name: row.get("name")?,
            content: row.get("content")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_note(self) -> StoreResult<Note> {
        let content: RawDocument = serde_json::from_str(&self.content).map_err(|err| {
            StoreError::InvalidData(format!("note {} has unreadable content: {err}", self.id))
        })?;
        Ok(Note {
            id: parse_uuid(&self.id, "id")?,
            project_id: parse_uuid(&self.project_id, "project_id")?,
            owner_id: parse_uuid(&self.owner_id, "owner_id")?,
            name: self.name,
            content,
            updated_at: self.updated_at,
        })
    }
}

fn encode_content(content: &RawDocument) -> StoreResult<String> {
    serde_json::to_string(content)
        .map_err(|err| StoreError::InvalidData(format!("cannot encode note content: {err}")))
}

fn parse_uuid(value: &str, column: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid value `{value}` in notes.{column}")))
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::from_raw;

    #[test]
    fn default_names_count_notes_across_projects() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        let owner = Uuid::new_v4();
        let first = store.create_note(owner, Uuid::new_v4()).unwrap();
        let second = store.create_note(owner, Uuid::new_v4()).unwrap();
        assert_eq!(first.name, "Note #1");
        assert_eq!(second.name, "Note #2");
    }

    #[test]
    fn created_note_holds_empty_document() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        let note = store.create_note(Uuid::new_v4(), Uuid::new_v4()).unwrap();
        let loaded = store.get_note_content(note.id).unwrap();
        assert_eq!(from_raw(loaded.content).unwrap(), Document::empty());
    }

    #[test]
    fn update_always_advances_timestamp() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        let note = store.create_note(Uuid::new_v4(), Uuid::new_v4()).unwrap();
        let first = store.update_note(note.id, &NoteUpdate::name("a")).unwrap();
        let second = store.update_note(note.id, &NoteUpdate::name("b")).unwrap();
        assert!(first.updated_at > note.updated_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[test]
    fn corrupt_content_is_reported_as_invalid_data() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        let note = store.create_note(Uuid::new_v4(), Uuid::new_v4()).unwrap();
        store
            .conn
            .execute(
                "UPDATE notes SET content = '{\"blocks\": 7}' WHERE id = ?1;",
                [note.id.to_string()],
            )
            .unwrap();
        let err = store.get_note_content(note.id).unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
    }

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            SqliteNoteStore::try_new(conn),
            Err(StoreError::InvalidData(_))
        ));
    }
}
