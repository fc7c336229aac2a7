//! Pure editing operations over snapshots.
//!
//! # Responsibility
//! - Turn one user intent into a new `EditorSnapshot`.
//! - Keep blocks canonical while text is inserted, deleted, split or merged.
//!
//! # Invariants
//! - Operations never fail; invalid input returns the input snapshot unchanged.
//! - Operations that do not change text reuse the input document allocation.
//! - List depth never exceeds the supplied `max_depth`.

use crate::editor::snapshot::EditorSnapshot;
use crate::model::document::{
    fresh_key, Block, BlockType, CharMeta, Document, InlineStyle, StyleSet,
};
use crate::model::selection::{Selection, SelectionSpan};
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Deepest list nesting reachable with indent.
pub const DEFAULT_MAX_DEPTH: u8 = 4;

/// Abstract command symbol produced by key bindings or toolbar buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorCommand {
    Bold,
    Italic,
    Underline,
    /// Monospace inline style.
    Code,
    Indent,
    Outdent,
    SplitBlock,
    Backspace,
    Delete,
    Undo,
    Redo,
}

impl EditorCommand {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Underline => "underline",
            Self::Code => "code",
            Self::Indent => "indent",
            Self::Outdent => "outdent",
            Self::SplitBlock => "split-block",
            Self::Backspace => "backspace",
            Self::Delete => "delete",
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }

    /// Parses a command symbol; `None` for symbols with no bound command.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let command = match symbol.trim() {
            "bold" => Self::Bold,
            "italic" => Self::Italic,
            "underline" => Self::Underline,
            "code" | "monospace" => Self::Code,
            "indent" => Self::Indent,
            "outdent" => Self::Outdent,
            "split-block" => Self::SplitBlock,
            "backspace" => Self::Backspace,
            "delete" => Self::Delete,
            "undo" => Self::Undo,
            "redo" => Self::Redo,
            _ => return None,
        };
        Some(command)
    }

    pub fn inline_style(self) -> Option<InlineStyle> {
        match self {
            Self::Bold => Some(InlineStyle::Bold),
            Self::Italic => Some(InlineStyle::Italic),
            Self::Underline => Some(InlineStyle::Underline),
            Self::Code => Some(InlineStyle::Code),
            _ => None,
        }
    }
}

/// Result of dispatching a command.
///
/// `handled == false` tells the caller to apply its own fallback; the
/// snapshot is then the input snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResult {
    pub snapshot: EditorSnapshot,
    pub handled: bool,
}

impl CommandResult {
    fn handled(snapshot: EditorSnapshot) -> Self {
        Self {
            snapshot,
            handled: true,
        }
    }

    fn not_handled(snapshot: &EditorSnapshot) -> Self {
        Self {
            snapshot: snapshot.clone(),
            handled: false,
        }
    }
}

/// Dispatches a bound command. History commands are left to `Editor`.
pub fn handle_command(
    snapshot: &EditorSnapshot,
    command: EditorCommand,
    max_depth: u8,
) -> CommandResult {
    if let Some(style) = command.inline_style() {
        return CommandResult::handled(toggle_inline_style(snapshot, style));
    }
    match command {
        EditorCommand::Indent => CommandResult::handled(indent(snapshot, max_depth)),
        EditorCommand::Outdent => CommandResult::handled(outdent(snapshot)),
        EditorCommand::SplitBlock => CommandResult::handled(split_block(snapshot)),
        EditorCommand::Backspace => CommandResult::handled(backspace(snapshot)),
        EditorCommand::Delete => CommandResult::handled(delete_forward(snapshot)),
        _ => CommandResult::not_handled(snapshot),
    }
}

/// Dispatches a command given by symbol; unknown symbols are not handled.
pub fn handle_command_symbol(
    snapshot: &EditorSnapshot,
    symbol: &str,
    max_depth: u8,
) -> CommandResult {
    match EditorCommand::from_symbol(symbol) {
        Some(command) => handle_command(snapshot, command, max_depth),
        None => CommandResult::not_handled(snapshot),
    }
}

/// Moves the selection, recomputing formatting state.
pub fn set_selection(snapshot: &EditorSnapshot, selection: Selection) -> EditorSnapshot {
    if !selection.is_valid_in(snapshot.document()) {
        return snapshot.clone();
    }
    EditorSnapshot::with_selection(Arc::clone(snapshot.document_arc()), selection)
}

/// Replaces the text spanned by `selection` with `new_text`.
///
/// Inserted chars take the pending inline styles when `selection` is the
/// snapshot's own selection, otherwise the styles at `selection`. Each `\n`
/// in `new_text` splits the block. The cursor ends after the inserted text.
pub fn apply_text_edit(
    snapshot: &EditorSnapshot,
    selection: &Selection,
    new_text: &str,
) -> EditorSnapshot {
    let document = snapshot.document();
    let Some(span) = selection.resolve(document) else {
        return snapshot.clone();
    };
    if span.is_collapsed() && new_text.is_empty() {
        return snapshot.clone();
    }

    let styles = if selection == snapshot.selection() {
        snapshot.current_inline_styles().clone()
    } else {
        EditorSnapshot::with_selection(Arc::clone(snapshot.document_arc()), selection.clone())
            .current_inline_styles()
            .clone()
    };
    let fill = CharMeta {
        styles,
        entity: None,
    };

    let mut blocks = document.blocks().to_vec();
    let (mut index, mut offset) = remove_span(&mut blocks, &span);
    for (line_no, line) in new_text.split('\n').enumerate() {
        if line_no > 0 {
            let key = fresh_key(&blocks);
            let tail = blocks[index].split_off(offset, key);
            blocks.insert(index + 1, tail);
            index += 1;
            offset = 0;
        }
        let line = line.trim_end_matches('\r');
        blocks[index].splice(offset, offset, line, &fill);
        offset += line.chars().count();
    }
    finish(snapshot, blocks, index, offset)
}

/// Toggles `style` over the selection, or in the pending styles when collapsed.
///
/// The style is removed when every selected char already carries it,
/// otherwise added to every selected char.
pub fn toggle_inline_style(snapshot: &EditorSnapshot, style: InlineStyle) -> EditorSnapshot {
    let document = snapshot.document();
    let Some(span) = snapshot.selection().resolve(document) else {
        return snapshot.clone();
    };

    if span.is_collapsed() {
        let mut pending: StyleSet = snapshot.current_inline_styles().clone();
        if !pending.remove(&style) {
            pending.insert(style);
        }
        return snapshot.with_pending_styles(pending);
    }

    let mut selected_chars = 0;
    let mut fully_styled = true;
    for index in span.start_index..=span.end_index {
        let block = &document.blocks()[index];
        let (start, end) = span.block_bounds(index, block.len_chars());
        if start >= end {
            continue;
        }
        selected_chars += end - start;
        let meta = block.char_meta();
        if meta[start..end]
            .iter()
            .any(|slot| !slot.styles.contains(&style))
        {
            fully_styled = false;
        }
    }
    if selected_chars == 0 {
        return snapshot.clone();
    }

    let mut blocks = document.blocks().to_vec();
    for (index, block) in blocks
        .iter_mut()
        .enumerate()
        .take(span.end_index + 1)
        .skip(span.start_index)
    {
        let (start, end) = span.block_bounds(index, block.len_chars());
        if start >= end {
            continue;
        }
        let chars: Vec<char> = block.text.chars().collect();
        let mut meta = block.char_meta();
        for slot in &mut meta[start..end] {
            if fully_styled {
                slot.styles.remove(&style);
            } else {
                slot.styles.insert(style);
            }
        }
        block.rebuild(&chars, &meta);
    }

    let next = Document::from_canonical(blocks, document.entity_map().clone());
    EditorSnapshot::with_selection(Arc::new(next), snapshot.selection().clone())
}

/// Sets `block_type` on every selected block, or `unstyled` when the first
/// selected block already has it. Leaving a list type resets depth.
pub fn toggle_block_type(snapshot: &EditorSnapshot, block_type: BlockType) -> EditorSnapshot {
    let document = snapshot.document();
    let Some(span) = snapshot.selection().resolve(document) else {
        return snapshot.clone();
    };

    let target = if document.blocks()[span.start_index].block_type == block_type {
        BlockType::Unstyled
    } else {
        block_type
    };

    let mut blocks = document.blocks().to_vec();
    for index in affected_blocks(&span) {
        let block = &mut blocks[index];
        block.block_type = target;
        if !target.is_list() {
            block.depth = 0;
        }
    }
    let next = Document::from_canonical(blocks, document.entity_map().clone());
    EditorSnapshot::with_selection(Arc::new(next), snapshot.selection().clone())
}

/// Increases depth of selected list items, bounded by `max_depth`.
pub fn indent(snapshot: &EditorSnapshot, max_depth: u8) -> EditorSnapshot {
    adjust_depth(snapshot, |block| {
        (block.block_type.is_list() && block.depth < max_depth).then(|| block.depth + 1)
    })
}

/// Decreases depth of selected list items, bounded by zero.
pub fn outdent(snapshot: &EditorSnapshot) -> EditorSnapshot {
    adjust_depth(snapshot, |block| {
        (block.block_type.is_list() && block.depth > 0).then(|| block.depth - 1)
    })
}

fn adjust_depth(
    snapshot: &EditorSnapshot,
    next_depth: impl Fn(&Block) -> Option<u8>,
) -> EditorSnapshot {
    let document = snapshot.document();
    let Some(span) = snapshot.selection().resolve(document) else {
        return snapshot.clone();
    };

    let mut blocks = document.blocks().to_vec();
    let mut changed = false;
    for index in affected_blocks(&span) {
        if let Some(depth) = next_depth(&blocks[index]) {
            blocks[index].depth = depth;
            changed = true;
        }
    }
    if !changed {
        return snapshot.clone();
    }
    let next = Document::from_canonical(blocks, document.entity_map().clone());
    EditorSnapshot::with_selection(Arc::new(next), snapshot.selection().clone())
}

/// Splits the block at the cursor (Enter), deleting any selected text first.
///
/// An empty styled block is lifted instead: list items lose one level of
/// depth, anything else becomes unstyled.
pub fn split_block(snapshot: &EditorSnapshot) -> EditorSnapshot {
    let document = snapshot.document();
    let Some(span) = snapshot.selection().resolve(document) else {
        return snapshot.clone();
    };

    let mut blocks = document.blocks().to_vec();
    let (index, offset) = remove_span(&mut blocks, &span);

    let block = &mut blocks[index];
    if span.is_collapsed() && block.is_empty() && block.block_type != BlockType::Unstyled {
        if block.block_type.is_list() && block.depth > 0 {
            block.depth -= 1;
        } else {
            block.block_type = BlockType::Unstyled;
            block.depth = 0;
        }
        return finish(snapshot, blocks, index, 0);
    }

    let key = fresh_key(&blocks);
    let tail = blocks[index].split_off(offset, key);
    blocks.insert(index + 1, tail);
    finish(snapshot, blocks, index + 1, 0)
}

/// Deletes backward: the selection, the previous char, or the block boundary.
///
/// At the start of a styled block that is empty (or first in the document)
/// the block style is removed instead of merging.
pub fn backspace(snapshot: &EditorSnapshot) -> EditorSnapshot {
    let document = snapshot.document();
    let Some(span) = snapshot.selection().resolve(document) else {
        return snapshot.clone();
    };

    let mut blocks = document.blocks().to_vec();
    if !span.is_collapsed() {
        let (index, offset) = remove_span(&mut blocks, &span);
        return finish(snapshot, blocks, index, offset);
    }

    let (index, offset) = (span.start_index, span.start_offset);
    if offset > 0 {
        blocks[index].splice(offset - 1, offset, "", &CharMeta::default());
        return finish(snapshot, blocks, index, offset - 1);
    }

    let block = &mut blocks[index];
    if block.block_type != BlockType::Unstyled && (block.is_empty() || index == 0) {
        block.block_type = BlockType::Unstyled;
        block.depth = 0;
        return finish(snapshot, blocks, index, 0);
    }
    if index == 0 {
        return snapshot.clone();
    }

    let current = blocks.remove(index);
    let join_at = blocks[index - 1].len_chars();
    blocks[index - 1].append(&current);
    finish(snapshot, blocks, index - 1, join_at)
}

/// Deletes forward: the selection, the next char, or joins the next block.
pub fn delete_forward(snapshot: &EditorSnapshot) -> EditorSnapshot {
    let document = snapshot.document();
    let Some(span) = snapshot.selection().resolve(document) else {
        return snapshot.clone();
    };

    let mut blocks = document.blocks().to_vec();
    if !span.is_collapsed() {
        let (index, offset) = remove_span(&mut blocks, &span);
        return finish(snapshot, blocks, index, offset);
    }

    let (index, offset) = (span.start_index, span.start_offset);
    if offset < blocks[index].len_chars() {
        blocks[index].splice(offset, offset + 1, "", &CharMeta::default());
        return finish(snapshot, blocks, index, offset);
    }
    if index + 1 >= blocks.len() {
        return snapshot.clone();
    }

    let next = blocks.remove(index + 1);
    blocks[index].append(&next);
    finish(snapshot, blocks, index, offset)
}

/// Blocks a block-level command applies to. A selection ending at offset 0
/// of a later block does not include that block.
fn affected_blocks(span: &SelectionSpan) -> RangeInclusive<usize> {
    let end = if !span.is_collapsed() && span.end_offset == 0 && span.end_index > span.start_index
    {
        span.end_index - 1
    } else {
        span.end_index
    };
    span.start_index..=end
}

/// Removes the selected text, joining the boundary blocks. Returns the cursor.
fn remove_span(blocks: &mut Vec<Block>, span: &SelectionSpan) -> (usize, usize) {
    if span.is_collapsed() {
        return (span.start_index, span.start_offset);
    }
    if span.start_index == span.end_index {
        blocks[span.start_index].splice(
            span.start_offset,
            span.end_offset,
            "",
            &CharMeta::default(),
        );
        return (span.start_index, span.start_offset);
    }

    let end_block = &blocks[span.end_index];
    let rest = end_block
        .clone()
        .split_off(span.end_offset, end_block.key.clone());
    let start_block = &mut blocks[span.start_index];
    start_block.splice(span.start_offset, usize::MAX, "", &CharMeta::default());
    start_block.append(&rest);
    blocks.drain(span.start_index + 1..=span.end_index);
    (span.start_index, span.start_offset)
}

fn finish(snapshot: &EditorSnapshot, blocks: Vec<Block>, index: usize, offset: usize) -> EditorSnapshot {
    let key = blocks[index].key.clone();
    let next = Document::from_canonical(blocks, snapshot.document().entity_map().clone());
    EditorSnapshot::with_selection(Arc::new(next), Selection::collapsed(key, offset))
}
