//! Rich-text document model.
//!
//! # Responsibility
//! - Define blocks, inline style ranges, entity ranges and the entity map.
//! - Provide pure queries (`has_text`, `block`, placeholder rule, preview).
//! - Provide per-character splice helpers used by the editing state machine.
//!
//! # Invariants
//! - Offsets and lengths count `char`s (Unicode scalar values) of `text`.
//! - Ranges are canonical: sorted, same-style runs merged, no empty ranges.
//! - Entity ranges never overlap and always reference a mapped entity.
//! - A document never has zero blocks.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Key of the single block in `Document::empty()`.
pub const ROOT_BLOCK_KEY: &str = "root";

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Stable identifier of a block within one document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKey(String);

impl BlockKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a short random key. Callers check uniqueness in their document.
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..8].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BlockKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Structural kind of a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    #[default]
    Unstyled,
    Blockquote,
    UnorderedListItem,
    OrderedListItem,
    CodeBlock,
}

impl BlockType {
    /// Wire name, as used in the raw document format.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unstyled => "unstyled",
            Self::Blockquote => "blockquote",
            Self::UnorderedListItem => "unordered-list-item",
            Self::OrderedListItem => "ordered-list-item",
            Self::CodeBlock => "code-block",
        }
    }

    /// Only list items carry a meaningful nesting depth.
    pub fn is_list(self) -> bool {
        matches!(self, Self::UnorderedListItem | Self::OrderedListItem)
    }
}

/// Inline formatting attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InlineStyle {
    Bold,
    Italic,
    Underline,
    /// Monospace.
    Code,
}

impl InlineStyle {
    pub const ALL: [InlineStyle; 4] = [Self::Bold, Self::Italic, Self::Underline, Self::Code];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bold => "BOLD",
            Self::Italic => "ITALIC",
            Self::Underline => "UNDERLINE",
            Self::Code => "CODE",
        }
    }
}

/// Set of inline styles active on one character or at the cursor.
pub type StyleSet = BTreeSet<InlineStyle>;

/// Key into a document's entity map.
pub type EntityKey = u32;

/// Character span carrying one inline style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleRange {
    pub offset: usize,
    pub length: usize,
    pub style: InlineStyle,
}

impl StyleRange {
    pub fn new(offset: usize, length: usize, style: InlineStyle) -> Self {
        Self {
            offset,
            length,
            style,
        }
    }
}

/// Character span referencing an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRange {
    pub offset: usize,
    pub length: usize,
    pub key: EntityKey,
}

/// How an entity reacts to edits of its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityMutability {
    Mutable,
    Immutable,
    Segmented,
}

/// Non-text object (link, embed) referenced from entity ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Serialized as `type`, e.g. `LINK`.
    #[serde(rename = "type")]
    pub entity_type: String,
    pub mutability: EntityMutability,
    #[serde(default = "empty_object")]
    pub data: Value,
}

impl Entity {
    pub fn link(url: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("url".to_string(), Value::String(url.into()));
        Self {
            entity_type: "LINK".to_string(),
            mutability: EntityMutability::Mutable,
            data: Value::Object(data),
        }
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Errors raised by document construction and lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// No block with the given key exists.
    BlockNotFound(BlockKey),
    /// Blocks or ranges violate a structural invariant.
    Malformed(String),
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlockNotFound(key) => write!(f, "block not found: {key}"),
            Self::Malformed(details) => write!(f, "malformed document: {details}"),
        }
    }
}

impl Error for DocumentError {}

/// Formatting carried by a single character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CharMeta {
    pub(crate) styles: StyleSet,
    pub(crate) entity: Option<EntityKey>,
}

/// One paragraph-like unit of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub key: BlockKey,
    pub text: String,
    pub block_type: BlockType,
    pub depth: u8,
    pub inline_style_ranges: Vec<StyleRange>,
    pub entity_ranges: Vec<EntityRange>,
    /// Opaque per-block metadata, carried through untouched.
    pub data: Map<String, Value>,
}

impl Block {
    /// Creates an unstyled block at depth 0 without formatting.
    pub fn new(key: impl Into<BlockKey>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            block_type: BlockType::Unstyled,
            depth: 0,
            inline_style_ranges: Vec::new(),
            entity_ranges: Vec::new(),
            data: Map::new(),
        }
    }

    pub fn with_type(mut self, block_type: BlockType) -> Self {
        self.block_type = block_type;
        self
    }

    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_style(mut self, offset: usize, length: usize, style: InlineStyle) -> Self {
        self.inline_style_ranges
            .push(StyleRange::new(offset, length, style));
        self
    }

    pub fn with_entity(mut self, offset: usize, length: usize, key: EntityKey) -> Self {
        self.entity_ranges.push(EntityRange {
            offset,
            length,
            key,
        });
        self
    }

    /// Text length in chars.
    pub fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Styles applied to the char at `offset`; empty when out of range.
    pub fn styles_at(&self, offset: usize) -> StyleSet {
        self.inline_style_ranges
            .iter()
            .filter(|range| range.offset <= offset && offset < range.offset + range.length)
            .map(|range| range.style)
            .collect()
    }

    pub fn entity_at(&self, offset: usize) -> Option<EntityKey> {
        self.entity_ranges
            .iter()
            .find(|range| range.offset <= offset && offset < range.offset + range.length)
            .map(|range| range.key)
    }

    /// Expands ranges to one `CharMeta` per char.
    pub(crate) fn char_meta(&self) -> Vec<CharMeta> {
        let len = self.len_chars();
        let mut meta = vec![CharMeta::default(); len];
        for range in &self.inline_style_ranges {
            let end = (range.offset + range.length).min(len);
            for slot in meta.iter_mut().take(end).skip(range.offset) {
                slot.styles.insert(range.style);
            }
        }
        for range in &self.entity_ranges {
            let end = (range.offset + range.length).min(len);
            for slot in meta.iter_mut().take(end).skip(range.offset) {
                slot.entity = Some(range.key);
            }
        }
        meta
    }

    /// Replaces text and formatting, recompressing ranges into canonical form.
    pub(crate) fn rebuild(&mut self, chars: &[char], meta: &[CharMeta]) {
        debug_assert_eq!(chars.len(), meta.len());
        self.text = chars.iter().collect();
        self.inline_style_ranges = compress_styles(meta);
        self.entity_ranges = compress_entities(meta);
    }

    /// Replaces chars `[start, end)` with `insert`, each inserted char carrying `fill`.
    pub(crate) fn splice(&mut self, start: usize, end: usize, insert: &str, fill: &CharMeta) {
        let mut chars: Vec<char> = self.text.chars().collect();
        let mut meta = self.char_meta();
        let end = end.min(chars.len());
        let start = start.min(end);
        let inserted: Vec<char> = insert.chars().collect();
        let inserted_meta = vec![fill.clone(); inserted.len()];
        chars.splice(start..end, inserted);
        meta.splice(start..end, inserted_meta);
        self.rebuild(&chars, &meta);
    }

    /// Cuts the block at `at`, returning the tail as a new block of the same type.
    pub(crate) fn split_off(&mut self, at: usize, key: BlockKey) -> Block {
        let mut chars: Vec<char> = self.text.chars().collect();
        let mut meta = self.char_meta();
        let at = at.min(chars.len());
        let tail_chars = chars.split_off(at);
        let tail_meta = meta.split_off(at);
        self.rebuild(&chars, &meta);

        let mut tail = Block::new(key, "")
            .with_type(self.block_type)
            .with_depth(self.depth);
        tail.rebuild(&tail_chars, &tail_meta);
        tail
    }

    /// Appends another block's text and formatting to this one.
    pub(crate) fn append(&mut self, other: &Block) {
        let mut chars: Vec<char> = self.text.chars().collect();
        let mut meta = self.char_meta();
        chars.extend(other.text.chars());
        meta.extend(other.char_meta());
        self.rebuild(&chars, &meta);
    }

    fn validate(&self, entity_map: &BTreeMap<EntityKey, Entity>) -> Result<(), DocumentError> {
        if self.key.as_str().is_empty() {
            return Err(DocumentError::Malformed("block key is empty".to_string()));
        }
        let len = self.len_chars();
        for range in &self.inline_style_ranges {
            check_span(&self.key, range.offset, range.length, len)?;
        }

        let mut spans: Vec<(usize, usize)> = Vec::with_capacity(self.entity_ranges.len());
        for range in &self.entity_ranges {
            check_span(&self.key, range.offset, range.length, len)?;
            if !entity_map.contains_key(&range.key) {
                return Err(DocumentError::Malformed(format!(
                    "block `{}` references missing entity {}",
                    self.key, range.key
                )));
            }
            spans.push((range.offset, range.offset + range.length));
        }
        spans.sort_unstable();
        if spans.windows(2).any(|pair| pair[0].1 > pair[1].0) {
            return Err(DocumentError::Malformed(format!(
                "block `{}` has overlapping entity ranges",
                self.key
            )));
        }
        Ok(())
    }

    fn canonicalize(&mut self) {
        let chars: Vec<char> = self.text.chars().collect();
        let meta = self.char_meta();
        self.rebuild(&chars, &meta);
    }
}

fn check_span(key: &BlockKey, offset: usize, length: usize, len: usize) -> Result<(), DocumentError> {
    let in_bounds = length > 0
        && offset < len
        && offset
            .checked_add(length)
            .is_some_and(|end| end <= len);
    if in_bounds {
        Ok(())
    } else {
        Err(DocumentError::Malformed(format!(
            "range offset={offset} length={length} outside block `{key}` of {len} chars"
        )))
    }
}

fn compress_styles(meta: &[CharMeta]) -> Vec<StyleRange> {
    let mut ranges = Vec::new();
    for style in InlineStyle::ALL {
        let mut run_start: Option<usize> = None;
        for (index, slot) in meta.iter().enumerate() {
            let styled = slot.styles.contains(&style);
            match (styled, run_start) {
                (true, None) => run_start = Some(index),
                (false, Some(start)) => {
                    ranges.push(StyleRange::new(start, index - start, style));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            ranges.push(StyleRange::new(start, meta.len() - start, style));
        }
    }
    ranges.sort_by_key(|range| (range.offset, range.style));
    ranges
}

fn compress_entities(meta: &[CharMeta]) -> Vec<EntityRange> {
    let mut ranges: Vec<EntityRange> = Vec::new();
    let mut current: Option<(usize, EntityKey)> = None;
    for (index, slot) in meta.iter().enumerate() {
        if current.map(|(_, key)| key) == slot.entity {
            continue;
        }
        if let Some((start, key)) = current.take() {
            ranges.push(EntityRange {
                offset: start,
                length: index - start,
                key,
            });
        }
        current = slot.entity.map(|key| (index, key));
    }
    if let Some((start, key)) = current {
        ranges.push(EntityRange {
            offset: start,
            length: meta.len() - start,
            key,
        });
    }
    ranges
}

/// Ordered blocks plus the entity map they reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
    entity_map: BTreeMap<EntityKey, Entity>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    /// A single empty unstyled block keyed `root`.
    pub fn empty() -> Self {
        Self {
            blocks: vec![Block::new(ROOT_BLOCK_KEY, "")],
            entity_map: BTreeMap::new(),
        }
    }

    /// Validates and canonicalizes blocks into a document.
    ///
    /// An empty block list yields the empty document (keeping `entity_map`).
    ///
    /// # Errors
    /// - `Malformed` on empty or duplicate keys, out-of-range or empty ranges,
    ///   overlapping entity ranges, or references to unmapped entities.
    pub fn from_parts(
        blocks: Vec<Block>,
        entity_map: BTreeMap<EntityKey, Entity>,
    ) -> Result<Self, DocumentError> {
        if blocks.is_empty() {
            return Ok(Self {
                blocks: vec![Block::new(ROOT_BLOCK_KEY, "")],
                entity_map,
            });
        }

        let mut seen = HashSet::with_capacity(blocks.len());
        for block in &blocks {
            if !seen.insert(block.key.clone()) {
                return Err(DocumentError::Malformed(format!(
                    "duplicate block key `{}`",
                    block.key
                )));
            }
            block.validate(&entity_map)?;
        }

        let mut blocks = blocks;
        for block in &mut blocks {
            block.canonicalize();
        }
        Ok(Self { blocks, entity_map })
    }

    /// Builds a document from blocks the editor already keeps canonical.
    pub(crate) fn from_canonical(blocks: Vec<Block>, entity_map: BTreeMap<EntityKey, Entity>) -> Self {
        debug_assert!(!blocks.is_empty());
        Self { blocks, entity_map }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn entity_map(&self) -> &BTreeMap<EntityKey, Entity> {
        &self.entity_map
    }

    pub fn entity(&self, key: EntityKey) -> Option<&Entity> {
        self.entity_map.get(&key)
    }

    /// True iff any block has non-empty text.
    pub fn has_text(&self) -> bool {
        self.blocks.iter().any(|block| !block.text.is_empty())
    }

    /// Looks up a block by key.
    pub fn block(&self, key: &BlockKey) -> Result<&Block, DocumentError> {
        self.blocks
            .iter()
            .find(|block| &block.key == key)
            .ok_or_else(|| DocumentError::BlockNotFound(key.clone()))
    }

    pub fn block_index(&self, key: &BlockKey) -> Option<usize> {
        self.blocks.iter().position(|block| &block.key == key)
    }

    pub fn first_block(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn last_block(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    /// Placeholder is shown only for a textless document starting unstyled.
    pub fn shows_placeholder(&self) -> bool {
        !self.has_text() && self.first_block().block_type == BlockType::Unstyled
    }

    /// Block texts joined with newlines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whitespace-normalized summary of at most `max_chars` chars.
    pub fn preview_text(&self, max_chars: usize) -> Option<String> {
        let joined = self.plain_text();
        let normalized = WHITESPACE_RE.replace_all(&joined, " ");
        let trimmed = normalized.trim();
        if trimmed.is_empty() || max_chars == 0 {
            None
        } else {
            Some(trimmed.chars().take(max_chars).collect())
        }
    }
}

/// Picks a key not used by any of `blocks`.
pub(crate) fn fresh_key(blocks: &[Block]) -> BlockKey {
    loop {
        let candidate = BlockKey::generate();
        if blocks.iter().all(|block| block.key != candidate) {
            return candidate;
        }
    }
}
