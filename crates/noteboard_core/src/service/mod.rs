//! Use-case orchestration over the editor, scheduler and note store.
//!
//! # Responsibility
//! - Own the note list, the current note and its live editor session.
//! - Keep the host shell decoupled from storage and timer details.

pub mod note_collection;

pub use note_collection::{
    HostShell, LoadOutcome, NoteCollection, NoteCollectionState, NotesError, Notice,
};
