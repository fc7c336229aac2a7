//! Core domain logic for Noteboard.
//! Rich-text notes: document model, editing state machine, autosave and the
//! note collection manager. Host shells render; this crate decides.

pub mod codec;
pub mod config;
pub mod db;
pub mod editor;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod sync;

pub use codec::{from_json, from_raw, to_json, to_raw, CodecError, RawBlock, RawDocument};
pub use config::{ConfigError, LoggingConfig, NotesConfig, SessionContext};
pub use editor::{
    map_key_binding, CommandOutcome, Editor, EditorCommand, EditorOptions, EditorSnapshot,
    FormattingState, Key, KeyBinding, KeyEvent, Modifiers,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::document::{
    Block, BlockKey, BlockType, Document, DocumentError, Entity, InlineStyle, StyleRange,
};
pub use model::note::{Note, NoteId, NoteSummary, OwnerId, ProjectId, SaveState};
pub use model::selection::Selection;
pub use service::{
    HostShell, LoadOutcome, NoteCollection, NoteCollectionState, NotesError, Notice,
};
pub use store::{NoteStore, NoteUpdate, SqliteNoteStore, StoreError, StoreResult};
pub use sync::AutosaveScheduler;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
