//! Editing state machine.
//!
//! # Responsibility
//! - Apply typing, key bindings and style toggles as pure snapshot transitions.
//! - Expose the formatting state at the selection for toolbar reflection.
//! - Own the live snapshot and its undo history (`Editor`).
//!
//! # Invariants
//! - Snapshots are never mutated in place; each command yields a new value.
//! - Invalid commands return the input snapshot unchanged.

pub mod commands;
pub mod history;
pub mod keymap;
pub mod snapshot;

pub use commands::{
    apply_text_edit, backspace, delete_forward, handle_command, handle_command_symbol, indent,
    outdent, set_selection, split_block, toggle_block_type, toggle_inline_style, CommandResult,
    EditorCommand, DEFAULT_MAX_DEPTH,
};
pub use history::{CommandOutcome, Editor, EditorOptions};
pub use keymap::{map_key_binding, Key, KeyBinding, KeyEvent, Modifiers};
pub use snapshot::{EditorSnapshot, FormattingState};
