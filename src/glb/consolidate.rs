//! Scene buffer consolidation.
//!
//! A glTF scene scatters its binary data across external files and base64
//! data URIs. [`GlbBuilder`] pulls every referenced resource into one
//! append-only body buffer and rewrites the document so that all
//! `bufferViews` point into a single buffer at index 0. The resulting
//! [`BodyBuffer`] remembers where each part landed so the emitters can verify
//! their offsets while writing the container.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::util::{Error, Result};

/// Which external resource kinds get embedded into the body alongside the
/// scene's buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbedOptions {
    pub images: bool,
    pub shaders: bool,
}

impl EmbedOptions {
    /// Embed every supported resource kind.
    pub fn all() -> Self {
        Self {
            images: true,
            shaders: true,
        }
    }
}

/// One appended resource and where it starts in the body.
#[derive(Debug, Clone)]
struct BodyPart {
    offset: usize,
    data: Vec<u8>,
}

/// The consolidated body: concatenated resources plus their recorded offsets.
#[derive(Debug, Clone, Default)]
pub struct BodyBuffer {
    parts: Vec<BodyPart>,
    total_len: usize,
}

impl BodyBuffer {
    /// Total length in bytes, before any container-level padding.
    #[inline]
    pub fn len(&self) -> usize {
        self.total_len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total_len == 0
    }

    /// Concatenate the parts into one contiguous buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len);
        for part in &self.parts {
            out.extend_from_slice(&part.data);
        }
        out
    }

    /// Visit each part as `(recorded offset, bytes)`.
    pub(crate) fn parts(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.parts.iter().map(|p| (p.offset, p.data.as_slice()))
    }
}

/// Consolidates a scene document's resources into one body buffer.
///
/// Owns the body for the duration of one consolidation; create a new builder
/// per document.
#[derive(Debug)]
pub struct GlbBuilder {
    base_dir: PathBuf,
    body: BodyBuffer,
}

impl GlbBuilder {
    /// Create a builder resolving relative URIs against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            body: BodyBuffer::default(),
        }
    }

    /// Bytes appended so far.
    #[inline]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Resolve `uri` (base64 data URI or file relative to the base dir),
    /// append its bytes to the body, and return `(offset, length)`.
    ///
    /// With `declared_len`, the stored length is the smaller of declared and
    /// actual; a mismatch is logged but not an error.
    pub fn add_resource(&mut self, uri: &str, declared_len: Option<usize>) -> Result<(usize, usize)> {
        let mut data = self.resolve(uri)?;
        if let Some(declared) = declared_len {
            if declared != data.len() {
                warn!(
                    uri,
                    declared,
                    actual = data.len(),
                    "resource length mismatch, keeping the shorter"
                );
            }
            data.truncate(declared);
        }

        let offset = self.body.total_len;
        let length = data.len();
        self.body.total_len += length;
        self.body.parts.push(BodyPart { offset, data });
        debug!(uri, offset, length, "appended resource");
        Ok((offset, length))
    }

    /// Take the body without consolidating a document, for callers driving
    /// [`add_resource`](Self::add_resource) themselves.
    pub fn into_body(self) -> BodyBuffer {
        self.body
    }

    fn resolve(&self, uri: &str) -> Result<Vec<u8>> {
        if let Some(rest) = uri.strip_prefix("data:") {
            let payload = rest
                .split_once(";base64,")
                .map(|(_, payload)| payload)
                .ok_or_else(|| Error::DataUri(uri.chars().take(64).collect()))?;
            return Ok(BASE64.decode(payload)?);
        }
        let path = self.base_dir.join(uri);
        fs::read(&path).map_err(|e| Error::Resource {
            path,
            reason: e.to_string(),
        })
    }

    /// Consolidate `document` in place and take the finished body.
    ///
    /// Every entry of `buffers` is appended to the body and the array is
    /// collapsed to a single entry of the total length; every `bufferView`
    /// is shifted by its buffer's offset and retargeted to buffer 0. Enabled
    /// [`EmbedOptions`] kinds additionally pull `images`/`shaders` URIs into
    /// the body, each behind a freshly appended bufferView.
    pub fn consolidate(mut self, document: &mut Value, embed: EmbedOptions) -> Result<BodyBuffer> {
        let mut buffer_offsets = Vec::new();
        if let Some(buffers) = document.get("buffers").and_then(Value::as_array).cloned() {
            for (index, buffer) in buffers.iter().enumerate() {
                let uri = buffer
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::schema(format!("buffer {index} has no uri")))?;
                let declared = buffer
                    .get("byteLength")
                    .and_then(Value::as_u64)
                    .map(|n| n as usize);
                let (offset, _) = self.add_resource(uri, declared)?;
                buffer_offsets.push(offset);
            }
        }

        if let Some(views) = document.get_mut("bufferViews").and_then(Value::as_array_mut) {
            for (index, view) in views.iter_mut().enumerate() {
                let buffer = view
                    .get("buffer")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| Error::schema(format!("bufferView {index} has no buffer")))?
                    as usize;
                let base = *buffer_offsets.get(buffer).ok_or_else(|| {
                    Error::schema(format!("bufferView {index} references buffer {buffer}"))
                })?;
                let old = view.get("byteOffset").and_then(Value::as_u64).unwrap_or(0) as usize;
                view["byteOffset"] = json!(base + old);
                view["buffer"] = json!(0);
            }
        }

        if embed.shaders {
            self.embed_kind(document, "shaders")?;
        }
        if embed.images {
            self.embed_kind(document, "images")?;
        }

        document["buffers"] = json!([{ "byteLength": self.body.total_len }]);
        Ok(self.body)
    }

    /// Pull the `uri` of every entry in `document[kind]` into the body,
    /// pointing the entry at a new bufferView instead.
    fn embed_kind(&mut self, document: &mut Value, kind: &str) -> Result<()> {
        let Some(entries) = document.get(kind).and_then(Value::as_array).cloned() else {
            return Ok(());
        };

        let mut rewritten = Vec::with_capacity(entries.len());
        let mut new_views = Vec::new();
        for entry in entries {
            let mut entry = entry;
            if let Some(uri) = entry.get("uri").and_then(Value::as_str).map(str::to_owned) {
                let (offset, length) = self.add_resource(&uri, None)?;
                new_views.push(json!({
                    "buffer": 0,
                    "byteOffset": offset,
                    "byteLength": length,
                }));
                if let Some(obj) = entry.as_object_mut() {
                    obj.remove("uri");
                }
                // bufferView index is assigned once the views are appended
                entry["bufferView"] = Value::Null;
            }
            rewritten.push(entry);
        }

        let views = document
            .as_object_mut()
            .ok_or_else(|| Error::schema("document is not an object"))?
            .entry("bufferViews")
            .or_insert_with(|| json!([]));
        let views = views
            .as_array_mut()
            .ok_or_else(|| Error::schema("bufferViews is not an array"))?;
        let mut next_view = views.len();
        views.extend(new_views);

        for entry in &mut rewritten {
            if entry.get("bufferView") == Some(&Value::Null) {
                entry["bufferView"] = json!(next_view);
                next_view += 1;
            }
        }
        document[kind] = Value::Array(rewritten);
        Ok(())
    }
}

/// Consolidate a parsed scene document and serialize it deterministically.
///
/// Returns the `(jsonBytes, body)` pair ready for
/// [`emit_v1`](crate::glb::emit_v1) or [`emit_v2`](crate::glb::emit_v2).
pub fn consolidate_document(
    base_dir: impl AsRef<Path>,
    document: &mut Value,
    embed: EmbedOptions,
) -> Result<(Vec<u8>, BodyBuffer)> {
    let builder = GlbBuilder::new(base_dir.as_ref());
    let body = builder.consolidate(document, embed)?;
    let json = serde_json::to_vec(document)?;
    Ok((json, body))
}
