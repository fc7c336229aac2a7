//! Persistence scheduling between the editor and the note store.
//!
//! # Responsibility
//! - Debounce edits into store updates, one timer per note.
//! - Track per-note `SaveState` across issue and completion of update calls.
//!
//! # Invariants
//! - At most one update call per note is in flight.
//! - Time is always supplied by the caller; nothing here sleeps or spawns.

pub mod autosave;

pub use autosave::{AutosaveScheduler, SaveDecision, SaveOutcome, SaveTicket};
