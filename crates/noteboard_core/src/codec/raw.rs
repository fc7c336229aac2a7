use crate::model::document::{
    Block, BlockKey, BlockType, Document, DocumentError, Entity, EntityKey, EntityRange,
    StyleRange,
};
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Persisted document: `{ "blocks": [...], "entityMap": {...} }`.
///
/// Field order here is the serialized field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    pub blocks: Vec<RawBlock>,
    /// Entity keys are decimal strings on the wire.
    #[serde(default)]
    pub entity_map: BTreeMap<String, Entity>,
}

/// Persisted block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub key: String,
    pub text: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub depth: u8,
    #[serde(default)]
    pub inline_style_ranges: Vec<StyleRange>,
    #[serde(default)]
    pub entity_ranges: Vec<EntityRange>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Codec failure. Every variant means the input is not a valid document.
#[derive(Debug)]
pub enum CodecError {
    /// Input does not have the raw document shape or violates a document
    /// invariant.
    MalformedDocument(String),
    /// Text is not well-formed JSON, or reading it failed.
    Json(serde_json::Error),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedDocument(details) => write!(f, "malformed document: {details}"),
            Self::Json(err) => write!(f, "malformed document json: {err}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedDocument(_) => None,
            Self::Json(err) => Some(err),
        }
    }
}

impl From<DocumentError> for CodecError {
    fn from(value: DocumentError) -> Self {
        match value {
            DocumentError::Malformed(details) => Self::MalformedDocument(details),
            DocumentError::BlockNotFound(key) => {
                Self::MalformedDocument(format!("dangling block key `{key}`"))
            }
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<&Document> for RawDocument {
    fn from(document: &Document) -> Self {
        to_raw(document)
    }
}

/// Converts a document into its raw form, blocks in document order.
pub fn to_raw(document: &Document) -> RawDocument {
    let blocks = document
        .blocks()
        .iter()
        .map(|block| RawBlock {
            key: block.key.as_str().to_string(),
            text: block.text.clone(),
            block_type: block.block_type,
            depth: block.depth,
            inline_style_ranges: block.inline_style_ranges.clone(),
            entity_ranges: block.entity_ranges.clone(),
            data: block.data.clone(),
        })
        .collect();
    let entity_map = document
        .entity_map()
        .iter()
        .map(|(key, entity)| (key.to_string(), entity.clone()))
        .collect();
    RawDocument { blocks, entity_map }
}

/// Serializes a document to its canonical JSON string.
pub fn to_json(document: &Document) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&to_raw(document))?)
}

/// Rebuilds a document from its raw form.
///
/// # Errors
/// - `MalformedDocument` when an entity map key is not an integer, a block key
///   is empty or duplicated, a range falls outside its block text, or an entity
///   range references a key absent from `entityMap`.
pub fn from_raw(raw: RawDocument) -> Result<Document, CodecError> {
    let mut entity_map: BTreeMap<EntityKey, Entity> = BTreeMap::new();
    for (key, entity) in raw.entity_map {
        let parsed: EntityKey = key.trim().parse().map_err(|_| {
            CodecError::MalformedDocument(format!("entity map key `{key}` is not an integer"))
        })?;
        if entity_map.insert(parsed, entity).is_some() {
            return Err(CodecError::MalformedDocument(format!(
                "entity map key `{key}` repeats entity {parsed}"
            )));
        }
    }

    let blocks = raw
        .blocks
        .into_iter()
        .map(|raw_block| Block {
            key: BlockKey::new(raw_block.key),
            text: raw_block.text,
            block_type: raw_block.block_type,
            depth: raw_block.depth,
            inline_style_ranges: raw_block.inline_style_ranges,
            entity_ranges: raw_block.entity_ranges,
            data: raw_block.data,
        })
        .collect();

    Ok(Document::from_parts(blocks, entity_map)?)
}

/// Parses JSON text and rebuilds the document.
///
/// Missing required block fields (`key`, `text`, `type`, `depth`) and unknown
/// block types or styles are `MalformedDocument`; text that is not JSON at
/// all stays `CodecError::Json`.
pub fn from_json(json: &str) -> Result<Document, CodecError> {
    let raw: RawDocument = serde_json::from_str(json).map_err(|err| match err.classify() {
        Category::Data => CodecError::MalformedDocument(err.to_string()),
        Category::Io | Category::Syntax | Category::Eof => CodecError::Json(err),
    })?;
    from_raw(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::document::InlineStyle;

    #[test]
    fn empty_document_serializes_with_fixed_field_order() {
        let json = to_json(&Document::empty()).unwrap();
        assert_eq!(
            json,
            r#"{"blocks":[{"key":"root","text":"","type":"unstyled","depth":0,"inlineStyleRanges":[],"entityRanges":[],"data":{}}],"entityMap":{}}"#
        );
    }

    #[test]
    fn from_raw_rejects_non_numeric_entity_key() {
        let mut raw = to_raw(&Document::empty());
        raw.entity_map
            .insert("abc".to_string(), Entity::link("https://example.com"));
        let err = from_raw(raw).unwrap_err();
        assert!(matches!(err, CodecError::MalformedDocument(_)));
    }

    #[test]
    fn from_json_rejects_missing_block_field() {
        let json = r#"{"blocks":[{"key":"a","type":"unstyled","depth":0}],"entityMap":{}}"#;
        assert!(matches!(
            from_json(json),
            Err(CodecError::MalformedDocument(_))
        ));
    }

    #[test]
    fn from_json_keeps_syntax_errors_as_json() {
        assert!(matches!(from_json("{\"blocks\": ["), Err(CodecError::Json(_))));
        assert!(matches!(from_json("not a document"), Err(CodecError::Json(_))));
    }

    #[test]
    fn from_raw_rejects_entity_keys_that_collide() {
        let mut raw = to_raw(&Document::empty());
        raw.entity_map
            .insert("1".to_string(), Entity::link("https://one.example"));
        raw.entity_map
            .insert("01".to_string(), Entity::link("https://two.example"));
        let err = from_raw(raw).unwrap_err();
        assert!(matches!(err, CodecError::MalformedDocument(_)));
    }

    #[test]
    fn from_json_rejects_range_past_text_end() {
        let json = r#"{"blocks":[{"key":"a","text":"ab","type":"unstyled","depth":0,
            "inlineStyleRanges":[{"offset":1,"length":2,"style":"BOLD"}],
            "entityRanges":[],"data":{}}],"entityMap":{}}"#;
        assert!(matches!(
            from_json(json),
            Err(CodecError::MalformedDocument(_))
        ));
    }

    #[test]
    fn style_names_use_wire_spelling() {
        let block = Block::new("a", "bold").with_style(0, 4, InlineStyle::Bold);
        let doc = Document::from_parts(vec![block], BTreeMap::new()).unwrap();
        let json = to_json(&doc).unwrap();
        assert!(json.contains(r#"{"offset":0,"length":4,"style":"BOLD"}"#));
    }
}
