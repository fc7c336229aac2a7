//! Persisted note entities and per-note save state.
//!
//! # Invariants
//! - `NoteId` values are assigned by the note store and never reused.
//! - `content` is always the raw (serialized) document form.

use crate::codec::RawDocument;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned note identifier.
pub type NoteId = Uuid;
/// Identifier of the project a note belongs to.
pub type ProjectId = Uuid;
/// Opaque acting-user identifier supplied by the session provider.
pub type OwnerId = Uuid;

/// Full persisted note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub project_id: ProjectId,
    pub owner_id: OwnerId,
    pub name: String,
    pub content: RawDocument,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Note {
    pub fn summary(&self) -> NoteSummary {
        NoteSummary {
            id: self.id,
            name: self.name.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// List-level note metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: NoteId,
    pub name: String,
    pub updated_at: i64,
}

/// Whether a note's in-memory content matches what the store holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveState {
    #[default]
    Clean,
    Dirty,
    Saving,
    SaveFailed,
}

impl SaveState {
    /// True when local content may be ahead of the store.
    pub fn has_unsaved_changes(self) -> bool {
        !matches!(self, Self::Clean)
    }
}
