//! Semantic type registry.
//!
//! 3D Tiles feature and batch tables reserve a set of well-known property
//! names ("semantics") whose values are stored as typed binary columns rather
//! than JSON arrays. The registry maps each semantic to its fixed-width
//! little-endian wire type and drives the JSON-vs-binary decision in
//! [`PropertyTable::finalize`](crate::table::PropertyTable::finalize).
//!
//! The registry is built once and never mutated; it is shared by reference
//! across all tables in the process.

use byteorder::{LittleEndian, WriteBytesExt};
use serde_json::Value;

use crate::util::{Error, Result};

/// Fixed-width numeric wire type of a binary-encoded property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// 32-bit little-endian IEEE float.
    F32,
    /// 16-bit little-endian unsigned integer.
    U16,
    /// 8-bit unsigned integer.
    U8,
}

impl WireType {
    /// Encoded width of a single value in bytes.
    #[inline]
    pub const fn byte_width(self) -> usize {
        match self {
            WireType::F32 => 4,
            WireType::U16 => 2,
            WireType::U8 => 1,
        }
    }

    /// Short name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            WireType::F32 => "f32",
            WireType::U16 => "u16",
            WireType::U8 => "u8",
        }
    }
}

/// Well-known semantics and their wire types.
///
/// Covers the per-point, per-instance, and per-feature semantics of the
/// pnts/i3dm/b3dm feature tables.
const SEMANTICS: &[(&str, WireType)] = &[
    ("POSITION", WireType::F32),
    ("POSITION_QUANTIZED", WireType::U16),
    ("NORMAL", WireType::F32),
    ("NORMAL_UP", WireType::F32),
    ("NORMAL_RIGHT", WireType::F32),
    ("NORMAL_OCT16P", WireType::U8),
    ("NORMAL_UP_OCT32P", WireType::U16),
    ("NORMAL_RIGHT_OCT32P", WireType::U16),
    ("SCALE", WireType::F32),
    ("SCALE_NON_UNIFORM", WireType::F32),
    ("RGB", WireType::U8),
    ("RGBA", WireType::U8),
    ("RGB565", WireType::U16),
    ("BATCH_ID", WireType::U16),
];

/// Immutable mapping from property name to wire type.
#[derive(Debug)]
pub struct SemanticRegistry {
    entries: &'static [(&'static str, WireType)],
}

/// The process-wide registry instance.
static REGISTRY: SemanticRegistry = SemanticRegistry { entries: SEMANTICS };

/// Access the process-wide semantic registry.
pub fn registry() -> &'static SemanticRegistry {
    &REGISTRY
}

impl SemanticRegistry {
    /// Look up the wire type for a property name.
    pub fn get(&self, name: &str) -> Option<WireType> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, ty)| *ty)
    }

    /// True if `name` has a registered wire type.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Encode a JSON value as the binary column data for property `name`.
    ///
    /// Scalars become a single little-endian value; arrays are flattened
    /// depth-first, each numeric leaf encoded at the registered width.
    /// Fails with [`Error::UnknownSemantic`] if `name` is not registered and
    /// with [`Error::TypeMismatch`] if a leaf is not numeric.
    pub fn encode_value(&self, name: &str, value: &Value) -> Result<Vec<u8>> {
        let ty = self
            .get(name)
            .ok_or_else(|| Error::UnknownSemantic(name.to_string()))?;
        let mut out = Vec::new();
        encode_into(name, value, ty, &mut out)?;
        Ok(out)
    }
}

fn encode_into(name: &str, value: &Value, ty: WireType, out: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                encode_into(name, item, ty, out)?;
            }
            Ok(())
        }
        Value::Number(n) => encode_number(name, n, ty, out),
        other => Err(type_mismatch(name, ty, other)),
    }
}

fn encode_number(
    name: &str,
    n: &serde_json::Number,
    ty: WireType,
    out: &mut Vec<u8>,
) -> Result<()> {
    match ty {
        WireType::F32 => {
            let v = n
                .as_f64()
                .ok_or_else(|| type_mismatch(name, ty, &Value::Number(n.clone())))?;
            out.write_f32::<LittleEndian>(v as f32)?;
        }
        WireType::U16 => {
            let v = n
                .as_u64()
                .filter(|v| *v <= u16::MAX as u64)
                .ok_or_else(|| type_mismatch(name, ty, &Value::Number(n.clone())))?;
            out.write_u16::<LittleEndian>(v as u16)?;
        }
        WireType::U8 => {
            let v = n
                .as_u64()
                .filter(|v| *v <= u8::MAX as u64)
                .ok_or_else(|| type_mismatch(name, ty, &Value::Number(n.clone())))?;
            out.write_u8(v as u8)?;
        }
    }
    Ok(())
}

fn type_mismatch(name: &str, ty: WireType, value: &Value) -> Error {
    let actual = match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    };
    Error::TypeMismatch {
        name: name.to_string(),
        expected: ty.name().to_string(),
        actual,
    }
}
