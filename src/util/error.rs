//! Error types for the tilepack library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tilepack operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Magic bytes do not match the expected tile format
    #[error("Invalid magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic { expected: String, actual: String },

    /// Tile version is newer than this library supports
    #[error("Unsupported {format} version: {version}")]
    UnsupportedVersion { format: String, version: u32 },

    /// Input ends before a declared length is satisfied
    #[error("Truncated input: {context} needs {needed} bytes, {remaining} remain")]
    Truncated {
        context: String,
        needed: usize,
        remaining: usize,
    },

    /// Blob handed to the composite packer does not start with a known tile magic
    #[error("Unknown tile magic {magic:?}")]
    UnknownTileMagic { magic: String },

    /// Columns adopted into a property table disagree on feature count
    #[error("Column {name:?} has {actual} values, table has {expected} features")]
    ColumnLengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Binary encoding requested for a property with no registry entry
    #[error("No semantic type registered for property {0:?}")]
    UnknownSemantic(String),

    /// Non-numeric value passed to a binary column encoder
    #[error("Type mismatch for {name:?}: expected {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// Structural problem in table or document input
    #[error("Schema error: {0}")]
    Schema(String),

    /// External resource not found or unreadable
    #[error("Cannot read resource {path}: {reason}")]
    Resource { path: PathBuf, reason: String },

    /// Unsupported or malformed data URI
    #[error("Unsupported data URI: {0}")]
    DataUri(String),

    /// Encoder self-check failed; indicates a bug in this library, not in the input
    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse or serialize error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decode error in a data URI
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Create a schema error from a string.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create an internal-invariant error from a string.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InternalInvariant(msg.into())
    }

    /// Create a truncation error.
    pub fn truncated(context: impl Into<String>, needed: usize, remaining: usize) -> Self {
        Self::Truncated {
            context: context.into(),
            needed,
            remaining,
        }
    }
}

/// Result type alias for tilepack operations.
pub type Result<T> = std::result::Result<T, Error>;
