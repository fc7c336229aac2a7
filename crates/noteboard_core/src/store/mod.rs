//! Note store contract and the bundled SQLite implementation.
//!
//! # Responsibility
//! - Define the request/response calls the core makes against note storage.
//! - Map storage failures to semantic errors (`NotFound`) the core reacts to.
//!
//! # Invariants
//! - `list_notes` returns most recently updated notes first.
//! - `update_note` and `delete_note` report `NotFound` for unknown ids.
//! - Every successful `update_note` advances `updated_at`.

pub mod sqlite_store;

use crate::codec::RawDocument;
use crate::db::DbError;
use crate::model::note::{Note, NoteId, NoteSummary, OwnerId, ProjectId};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use sqlite_store::SqliteNoteStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// Note does not exist (never created or deleted by another actor).
    NotFound(NoteId),
    Db(DbError),
    /// Persisted row cannot be decoded.
    InvalidData(String),
    /// Transient transport failure; the call may succeed later.
    Unavailable(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid stored note: {message}"),
            Self::Unavailable(message) => write!(f, "note store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Partial note update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteUpdate {
    pub name: Option<String>,
    pub content: Option<RawDocument>,
}

impl NoteUpdate {
    pub fn content(content: RawDocument) -> Self {
        Self {
            name: None,
            content: Some(content),
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            content: None,
        }
    }
}

/// Remote note storage consumed by the core.
pub trait NoteStore {
    /// Note metadata for a project, most recently updated first.
    fn list_notes(&self, project_id: ProjectId) -> StoreResult<Vec<NoteSummary>>;
    /// One note with its content.
    fn get_note_content(&self, note_id: NoteId) -> StoreResult<Note>;
    /// Creates a note with empty content and a default name.
    fn create_note(&self, owner_id: OwnerId, project_id: ProjectId) -> StoreResult<Note>;
    /// Applies a partial update and returns the stored note.
    fn update_note(&self, note_id: NoteId, update: &NoteUpdate) -> StoreResult<Note>;
    fn delete_note(&self, note_id: NoteId) -> StoreResult<()>;
}
