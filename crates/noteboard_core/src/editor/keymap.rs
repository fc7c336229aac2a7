//! Key event to command mapping.

use crate::editor::commands::EditorCommand;

/// Physical key, reduced to what the bindings care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Tab,
    Enter,
    Backspace,
    Delete,
    Escape,
    /// Any key without a binding (arrows, function keys, ...).
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn primary(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Raw key press forwarded by the host shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    /// `key` with the platform primary modifier held.
    pub fn primary(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }
}

/// Outcome of key mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBinding {
    Command(EditorCommand),
    /// No bound command; the host handles the key (e.g. inserts the char).
    PassThrough,
}

/// Maps a key event to a bound command.
///
/// Tab/Shift+Tab map to indent/outdent; depth bounds are enforced when the
/// command is handled.
pub fn map_key_binding(event: &KeyEvent) -> KeyBinding {
    let modifiers = event.modifiers;
    if modifiers.alt {
        return KeyBinding::PassThrough;
    }

    let command = match event.key {
        Key::Tab if !modifiers.primary() => {
            if modifiers.shift {
                EditorCommand::Outdent
            } else {
                EditorCommand::Indent
            }
        }
        Key::Enter if !modifiers.primary() && !modifiers.shift => EditorCommand::SplitBlock,
        Key::Backspace if !modifiers.primary() => EditorCommand::Backspace,
        Key::Delete if !modifiers.primary() => EditorCommand::Delete,
        Key::Char(c) if modifiers.primary() => match (c.to_ascii_lowercase(), modifiers.shift) {
            ('b', false) => EditorCommand::Bold,
            ('i', false) => EditorCommand::Italic,
            ('u', false) => EditorCommand::Underline,
            ('j', false) => EditorCommand::Code,
            ('z', false) => EditorCommand::Undo,
            ('z', true) | ('y', false) => EditorCommand::Redo,
            _ => return KeyBinding::PassThrough,
        },
        _ => return KeyBinding::PassThrough,
    };
    KeyBinding::Command(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatting_shortcuts_need_primary_modifier() {
        assert_eq!(
            map_key_binding(&KeyEvent::primary(Key::Char('b'))),
            KeyBinding::Command(EditorCommand::Bold)
        );
        assert_eq!(
            map_key_binding(&KeyEvent::primary(Key::Char('J'))),
            KeyBinding::Command(EditorCommand::Code)
        );
        assert_eq!(
            map_key_binding(&KeyEvent::plain(Key::Char('b'))),
            KeyBinding::PassThrough
        );
    }

    #[test]
    fn tab_maps_to_indent_and_shift_tab_to_outdent() {
        assert_eq!(
            map_key_binding(&KeyEvent::plain(Key::Tab)),
            KeyBinding::Command(EditorCommand::Indent)
        );
        assert_eq!(
            map_key_binding(&KeyEvent::plain(Key::Tab).with_shift()),
            KeyBinding::Command(EditorCommand::Outdent)
        );
    }

    #[test]
    fn redo_has_two_chords() {
        assert_eq!(
            map_key_binding(&KeyEvent::primary(Key::Char('z')).with_shift()),
            KeyBinding::Command(EditorCommand::Redo)
        );
        assert_eq!(
            map_key_binding(&KeyEvent::primary(Key::Char('y'))),
            KeyBinding::Command(EditorCommand::Redo)
        );
    }

    #[test]
    fn unbound_keys_pass_through() {
        assert_eq!(map_key_binding(&KeyEvent::plain(Key::Escape)), KeyBinding::PassThrough);
        assert_eq!(
            map_key_binding(&KeyEvent::plain(Key::Enter).with_shift()),
            KeyBinding::PassThrough
        );
        assert_eq!(map_key_binding(&KeyEvent::primary(Key::Char('q'))), KeyBinding::PassThrough);
    }
}
