//! Domain model for rich-text notes.
//!
//! # Responsibility
//! - Define the in-memory document shape shared by codec, editor and sync.
//! - Define persisted note metadata and per-note save state.
//!
//! # Invariants
//! - A `Document` always holds at least one block and unique block keys.
//! - Every entity key referenced by a block exists in the entity map.
//! - Style and entity ranges stay inside their block text.

pub mod document;
pub mod note;
pub mod selection;
