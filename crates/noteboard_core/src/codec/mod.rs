//! Serialization codec between `Document` and its persisted raw form.
//!
//! # Responsibility
//! - Map documents to the JSON-compatible `RawDocument` wire shape and back.
//! - Reject raw input that violates block/range/entity invariants.
//!
//! # Invariants
//! - `to_json` is deterministic: equal documents give byte-identical JSON.
//! - `from_raw(to_raw(d)) == d` for every valid document `d`.

mod raw;

pub use raw::{from_json, from_raw, to_json, to_raw, CodecError, RawBlock, RawDocument};
