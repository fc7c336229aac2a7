//! Immutable editor snapshots.

use crate::model::document::{BlockType, Document, StyleSet};
use crate::model::selection::Selection;
use std::sync::Arc;

/// Active formatting at the selection, for toolbar highlighting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattingState {
    pub inline_styles: StyleSet,
    pub block_type: BlockType,
}

/// Document, selection and formatting state at one point of editing history.
///
/// Cloning is cheap: the document is shared behind an `Arc`, so commands that
/// do not touch text keep the same document allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSnapshot {
    document: Arc<Document>,
    selection: Selection,
    current_inline_styles: StyleSet,
    current_block_type: BlockType,
}

impl Default for EditorSnapshot {
    fn default() -> Self {
        Self::new(Document::empty())
    }
}

impl EditorSnapshot {
    /// Snapshot with the cursor at the start of `document`.
    pub fn new(document: Document) -> Self {
        let document = Arc::new(document);
        let selection = Selection::start_of(&document);
        Self::derive(document, selection)
    }

    /// Snapshot with formatting derived from the text at `selection`.
    ///
    /// An invalid selection falls back to the start of the document.
    pub fn with_selection(document: Arc<Document>, selection: Selection) -> Self {
        let selection = if selection.is_valid_in(&document) {
            selection
        } else {
            Selection::start_of(&document)
        };
        Self::derive(document, selection)
    }

    fn derive(document: Arc<Document>, selection: Selection) -> Self {
        let (current_inline_styles, current_block_type) = derive_formatting(&document, &selection);
        Self {
            document,
            selection,
            current_inline_styles,
            current_block_type,
        }
    }

    /// Same document and selection, with an explicit pending style set.
    pub(crate) fn with_pending_styles(&self, styles: StyleSet) -> Self {
        Self {
            document: Arc::clone(&self.document),
            selection: self.selection.clone(),
            current_inline_styles: styles,
            current_block_type: self.current_block_type,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_arc(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn current_inline_styles(&self) -> &StyleSet {
        &self.current_inline_styles
    }

    pub fn current_block_type(&self) -> BlockType {
        self.current_block_type
    }

    pub fn formatting_state(&self) -> FormattingState {
        FormattingState {
            inline_styles: self.current_inline_styles.clone(),
            block_type: self.current_block_type,
        }
    }

    /// True when both snapshots share one document allocation.
    pub fn same_document(&self, other: &EditorSnapshot) -> bool {
        Arc::ptr_eq(&self.document, &other.document)
    }

    pub fn shows_placeholder(&self) -> bool {
        self.document.shows_placeholder()
    }
}

fn derive_formatting(document: &Document, selection: &Selection) -> (StyleSet, BlockType) {
    let Some(span) = selection.resolve(document) else {
        return (StyleSet::new(), document.first_block().block_type);
    };
    let block = &document.blocks()[span.start_index];
    let styles = if span.is_collapsed() {
        if span.start_offset > 0 {
            block.styles_at(span.start_offset - 1)
        } else {
            block.styles_at(0)
        }
    } else {
        block.styles_at(span.start_offset)
    };
    (styles, block.block_type)
}
