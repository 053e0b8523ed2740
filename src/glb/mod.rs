//! Single-file binary scene containers (GLB).
//!
//! [`consolidate`] merges a scene's scattered buffers into one body and
//! rewrites the document to match; [`emit`] wraps the `(json, body)` pair in
//! either the legacy or the current container header. The emitted bytes can
//! stand alone as a `.glb` file or ride inside a tile as its payload.

pub mod consolidate;
pub mod emit;

pub use consolidate::{consolidate_document, BodyBuffer, EmbedOptions, GlbBuilder};
pub use emit::{emit_v1, emit_v2};
