//! Cursor and selection model.

use crate::model::document::{BlockKey, Document};

/// Anchor/focus selection over a document.
///
/// Offsets may equal the block length (cursor after the last char).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selection {
    pub anchor_key: BlockKey,
    pub anchor_offset: usize,
    pub focus_key: BlockKey,
    pub focus_offset: usize,
    pub is_backward: bool,
}

/// A selection resolved against a document into block indices, start first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSpan {
    pub start_index: usize,
    pub start_offset: usize,
    pub end_index: usize,
    pub end_offset: usize,
}

impl SelectionSpan {
    pub fn is_collapsed(&self) -> bool {
        self.start_index == self.end_index && self.start_offset == self.end_offset
    }

    /// Char span `[start, end)` this selection covers inside block `index`.
    pub(crate) fn block_bounds(&self, index: usize, block_len: usize) -> (usize, usize) {
        let start = if index == self.start_index {
            self.start_offset
        } else {
            0
        };
        let end = if index == self.end_index {
            self.end_offset
        } else {
            block_len
        };
        (start.min(block_len), end.min(block_len))
    }
}

impl Selection {
    /// Collapsed cursor at `offset` in block `key`.
    pub fn collapsed(key: impl Into<BlockKey>, offset: usize) -> Self {
        let key = key.into();
        Self {
            anchor_key: key.clone(),
            anchor_offset: offset,
            focus_key: key,
            focus_offset: offset,
            is_backward: false,
        }
    }

    /// Forward selection of `[start, end)` inside one block.
    pub fn within(key: impl Into<BlockKey>, start: usize, end: usize) -> Self {
        let key = key.into();
        Self {
            anchor_key: key.clone(),
            anchor_offset: start,
            focus_key: key,
            focus_offset: end,
            is_backward: end < start,
        }
    }

    /// Forward selection from one block position to another.
    pub fn between(
        start_key: impl Into<BlockKey>,
        start_offset: usize,
        end_key: impl Into<BlockKey>,
        end_offset: usize,
    ) -> Self {
        Self {
            anchor_key: start_key.into(),
            anchor_offset: start_offset,
            focus_key: end_key.into(),
            focus_offset: end_offset,
            is_backward: false,
        }
    }

    /// Cursor at the very start of `document`.
    pub fn start_of(document: &Document) -> Self {
        Self::collapsed(document.first_block().key.clone(), 0)
    }

    /// Cursor after the last char of `document`.
    pub fn end_of(document: &Document) -> Self {
        let last = document.last_block();
        Self::collapsed(last.key.clone(), last.len_chars())
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_key == self.focus_key && self.anchor_offset == self.focus_offset
    }

    /// Resolves against `document`, ordering endpoints by document position.
    ///
    /// Returns `None` when a key is unknown or an offset exceeds its block.
    /// `is_backward` is recomputed from positions rather than trusted.
    pub fn resolve(&self, document: &Document) -> Option<SelectionSpan> {
        let anchor_index = document.block_index(&self.anchor_key)?;
        let focus_index = document.block_index(&self.focus_key)?;
        if self.anchor_offset > document.blocks()[anchor_index].len_chars()
            || self.focus_offset > document.blocks()[focus_index].len_chars()
        {
            return None;
        }

        let anchor = (anchor_index, self.anchor_offset);
        let focus = (focus_index, self.focus_offset);
        let (start, end) = if focus < anchor {
            (focus, anchor)
        } else {
            (anchor, focus)
        };
        Some(SelectionSpan {
            start_index: start.0,
            start_offset: start.1,
            end_index: end.0,
            end_offset: end.1,
        })
    }

    pub fn is_valid_in(&self, document: &Document) -> bool {
        self.resolve(document).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::Block;
    use std::collections::BTreeMap;

    fn two_blocks() -> Document {
        Document::from_parts(
            vec![Block::new("a", "hello"), Block::new("b", "world")],
            BTreeMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn resolve_orders_backward_selection() {
        let doc = two_blocks();
        let selection = Selection {
            anchor_key: BlockKey::from("b"),
            anchor_offset: 2,
            focus_key: BlockKey::from("a"),
            focus_offset: 1,
            is_backward: false,
        };
        let span = selection.resolve(&doc).unwrap();
        assert_eq!((span.start_index, span.start_offset), (0, 1));
        assert_eq!((span.end_index, span.end_offset), (1, 2));
    }

    #[test]
    fn resolve_rejects_out_of_range_offset_and_unknown_key() {
        let doc = two_blocks();
        assert!(Selection::collapsed("a", 6).resolve(&doc).is_none());
        assert!(Selection::collapsed("zz", 0).resolve(&doc).is_none());
        assert!(Selection::collapsed("a", 5).is_valid_in(&doc));
    }
}
