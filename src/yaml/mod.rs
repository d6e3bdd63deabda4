//! Lightweight YAML decoding.
//!
//! Covers the subset found in CI workflow files: block mappings and
//! sequences, flow collections, quoted and plain scalars, comments. Anchors,
//! tags and multi-document streams are not supported. Block scalars (`|`,
//! `>`) decode to an empty string.

mod decoder;
mod value;

pub use decoder::decode;
pub use value::{Mapping, Value};
