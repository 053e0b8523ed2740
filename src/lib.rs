//! # tilepack
//!
//! Rust implementation of the 3D Tiles binary tile container formats and the
//! glTF-to-GLB packing step.
//!
//! The tile formats (b3dm, i3dm, pnts) share one shape: a fixed little-endian
//! header, a feature table and a batch table (each a JSON section plus an
//! optional binary section, both 4-byte aligned), and a trailing payload.
//! Composites (cmpt) nest any number of already-encoded tiles, recursively.
//! GLB consolidation merges a scene's scattered buffers into a single-file
//! binary container in either header generation.
//!
//! ## Modules
//!
//! - [`util`] - Errors, the read cursor, alignment helpers
//! - [`semantic`] - Well-known property names and their binary wire types
//! - [`table`] - Property tables (feature/batch table column store)
//! - [`tile`] - b3dm/i3dm/pnts encode and decode
//! - [`composite`] - cmpt pack and unpack
//! - [`glb`] - Buffer consolidation and GLB emission
//!
//! ## Example
//!
//! ```ignore
//! use tilepack::prelude::*;
//!
//! let mut batch = PropertyTable::new();
//! batch.load_rows(&rows)?;
//! let tile = tile::encode(&B3DM, PropertyTable::new(), batch,
//!                         Payload::Model(glb_bytes), 0, 0)?;
//! ```

pub mod composite;
pub mod glb;
pub mod semantic;
pub mod table;
pub mod tile;
pub mod util;

// Re-export commonly used types
pub use table::PropertyTable;
pub use tile::{DecodedTile, FormatSpec, Payload};
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::composite::{self, InnerTile};
    pub use crate::glb::{consolidate_document, emit_v1, emit_v2, EmbedOptions, GlbBuilder};
    pub use crate::semantic::{registry, WireType};
    pub use crate::table::PropertyTable;
    pub use crate::tile::{self, DecodedTile, Payload, B3DM, I3DM, PNTS};
    pub use crate::util::{Error, Result};
}
