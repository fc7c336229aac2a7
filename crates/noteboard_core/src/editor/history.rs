//! Live editor state with bounded undo/redo.

use crate::editor::commands::{self, EditorCommand, DEFAULT_MAX_DEPTH};
use crate::editor::keymap::{map_key_binding, KeyBinding, KeyEvent};
use crate::editor::snapshot::EditorSnapshot;
use crate::model::document::{BlockType, Document, InlineStyle};
use crate::model::selection::Selection;
use std::collections::VecDeque;

const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Tunables for the editing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorOptions {
    pub max_depth: u8,
    /// Undo entries kept; 0 disables history.
    pub history_limit: usize,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Result of a dispatched command or key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    /// False when the caller should apply its own fallback.
    pub handled: bool,
    /// True when the live snapshot was replaced.
    pub changed: bool,
}

impl CommandOutcome {
    const NOT_HANDLED: Self = Self {
        handled: false,
        changed: false,
    };
}

/// Owner of the live `EditorSnapshot`.
///
/// Every mutation goes through `commit`, which records document changes in
/// the undo history and drops no-op results.
#[derive(Debug, Clone)]
pub struct Editor {
    current: EditorSnapshot,
    undo_stack: VecDeque<EditorSnapshot>,
    redo_stack: Vec<EditorSnapshot>,
    options: EditorOptions,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

impl Editor {
    pub fn new(options: EditorOptions) -> Self {
        Self::with_document(Document::empty(), options)
    }

    pub fn with_document(document: Document, options: EditorOptions) -> Self {
        Self {
            current: EditorSnapshot::new(document),
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> EditorOptions {
        self.options
    }

    pub fn snapshot(&self) -> &EditorSnapshot {
        &self.current
    }

    /// Rehydrates with a new document and forgets history.
    pub fn reset(&mut self, document: Document) {
        self.current = EditorSnapshot::new(document);
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn set_selection(&mut self, selection: Selection) -> bool {
        let next = commands::set_selection(&self.current, selection);
        self.commit(next)
    }

    pub fn apply_text_edit(&mut self, selection: &Selection, new_text: &str) -> bool {
        let next = commands::apply_text_edit(&self.current, selection, new_text);
        self.commit(next)
    }

    /// Replaces the current selection with `text`.
    pub fn insert_text(&mut self, text: &str) -> bool {
        let selection = self.current.selection().clone();
        self.apply_text_edit(&selection, text)
    }

    pub fn toggle_inline_style(&mut self, style: InlineStyle) -> bool {
        let next = commands::toggle_inline_style(&self.current, style);
        self.commit(next)
    }

    pub fn toggle_block_type(&mut self, block_type: BlockType) -> bool {
        let next = commands::toggle_block_type(&self.current, block_type);
        self.commit(next)
    }

    pub fn dispatch_command(&mut self, command: EditorCommand) -> CommandOutcome {
        match command {
            EditorCommand::Undo => CommandOutcome {
                handled: true,
                changed: self.undo(),
            },
            EditorCommand::Redo => CommandOutcome {
                handled: true,
                changed: self.redo(),
            },
            other => {
                let result = commands::handle_command(&self.current, other, self.options.max_depth);
                if !result.handled {
                    return CommandOutcome::NOT_HANDLED;
                }
                CommandOutcome {
                    handled: true,
                    changed: self.commit(result.snapshot),
                }
            }
        }
    }

    /// Dispatches a command symbol; unknown symbols are not handled.
    pub fn dispatch_symbol(&mut self, symbol: &str) -> CommandOutcome {
        match EditorCommand::from_symbol(symbol) {
            Some(command) => self.dispatch_command(command),
            None => CommandOutcome::NOT_HANDLED,
        }
    }

    pub fn dispatch_key_event(&mut self, event: &KeyEvent) -> CommandOutcome {
        match map_key_binding(event) {
            KeyBinding::Command(command) => self.dispatch_command(command),
            KeyBinding::PassThrough => CommandOutcome::NOT_HANDLED,
        }
    }

    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.current, previous);
        self.redo_stack.push(current);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.current, next);
        self.push_undo(current);
        true
    }

    fn commit(&mut self, next: EditorSnapshot) -> bool {
        if next == self.current {
            return false;
        }
        if !next.same_document(&self.current) {
            let previous = std::mem::replace(&mut self.current, next);
            self.push_undo(previous);
            self.redo_stack.clear();
        } else {
            self.current = next;
        }
        true
    }

    fn push_undo(&mut self, snapshot: EditorSnapshot) {
        if self.options.history_limit == 0 {
            return;
        }
        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > self.options.history_limit {
            self.undo_stack.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::keymap::Key;

    #[test]
    fn undo_and_redo_walk_document_history() {
        let mut editor = Editor::default();
        assert!(editor.insert_text("a"));
        assert!(editor.insert_text("b"));
        assert_eq!(editor.snapshot().document().plain_text(), "ab");

        assert!(editor.undo());
        assert_eq!(editor.snapshot().document().plain_text(), "a");
        assert!(editor.redo());
        assert_eq!(editor.snapshot().document().plain_text(), "ab");
        assert!(!editor.redo());
    }

    #[test]
    fn new_edit_clears_redo_stack() {
        let mut editor = Editor::default();
        editor.insert_text("a");
        editor.undo();
        assert!(editor.can_redo());
        editor.insert_text("z");
        assert!(!editor.can_redo());
    }

    #[test]
    fn history_is_bounded() {
        let mut editor = Editor::new(EditorOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            history_limit: 2,
        });
        for text in ["a", "b", "c", "d"] {
            editor.insert_text(text);
        }
        assert!(editor.undo());
        assert!(editor.undo());
        assert!(!editor.undo());
        assert_eq!(editor.snapshot().document().plain_text(), "ab");
    }

    #[test]
    fn key_event_dispatch_reports_pass_through() {
        let mut editor = Editor::default();
        let outcome = editor.dispatch_key_event(&KeyEvent::plain(Key::Char('x')));
        assert!(!outcome.handled);
        let outcome = editor.dispatch_key_event(&KeyEvent::primary(Key::Char('b')));
        assert!(outcome.handled);
        assert!(outcome.changed);
    }

    #[test]
    fn pending_style_change_is_not_recorded_in_history() {
        let mut editor = Editor::default();
        assert!(editor.toggle_inline_style(InlineStyle::Bold));
        assert!(!editor.can_undo());
        editor.insert_text("x");
        assert_eq!(
            editor.snapshot().document().first_block().styles_at(0),
            [InlineStyle::Bold].into_iter().collect()
        );
    }
}
