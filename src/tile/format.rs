//! Tile format constants and per-format layout descriptions.
//!
//! Every tile container opens with the same self-describing prefix: a 4-byte
//! ASCII magic, a little-endian u32 version, and a little-endian u32 total
//! byte length. What follows the prefix differs per format and is captured by
//! [`FormatSpec`] values rather than per-format types.

/// Magic bytes of a batched-model tile.
pub const B3DM_MAGIC: &[u8; 4] = b"b3dm";

/// Magic bytes of an instanced-model tile.
pub const I3DM_MAGIC: &[u8; 4] = b"i3dm";

/// Magic bytes of a point-cloud tile.
pub const PNTS_MAGIC: &[u8; 4] = b"pnts";

/// Magic bytes of a composite container.
pub const CMPT_MAGIC: &[u8; 4] = b"cmpt";

/// Size of the composite container header in bytes.
pub const CMPT_HEADER_LEN: usize = 16;

/// Current composite container version.
pub const CMPT_VERSION: u32 = 1;

/// Size of the shared (magic, version, length) prefix in bytes.
pub const TILE_PREFIX_LEN: usize = 12;

/// GLB magic, the ASCII bytes `glTF` (written as one big-endian u32).
pub const GLB_MAGIC: u32 = 0x676C_5446;

/// Size of the legacy GLB (version 1) header in bytes.
pub const GLB_V1_HEADER_LEN: usize = 20;

/// Size of the current GLB (version 2) header in bytes, excluding chunk
/// descriptors.
pub const GLB_V2_HEADER_LEN: usize = 12;

/// Chunk type tag of the GLB v2 JSON chunk (`"JSON"`).
pub const GLB_CHUNK_JSON: u32 = 0x4E4F_534A;

/// Chunk type tag of the GLB v2 binary chunk (`"BIN\0"`).
pub const GLB_CHUNK_BIN: u32 = 0x004E_4942;

/// Required feature-table global naming the batch count.
pub const BATCH_LENGTH: &str = "BATCH_LENGTH";

/// Fixed layout of one tile format's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    /// Human-readable format name, used in errors.
    pub name: &'static str,
    /// Leading 4-byte magic.
    pub magic: &'static [u8; 4],
    /// Highest version this library reads and the version it writes.
    pub version: u32,
    /// Exact encoded header size in bytes.
    pub header_len: usize,
    /// Whether the header carries the i3dm payload-embedding flag.
    pub embed_flag: bool,
    /// Feature-count global written to the feature table, if the format
    /// has one (`INSTANCES_LENGTH`, `POINTS_LENGTH`).
    pub feature_count_semantic: Option<&'static str>,
    /// Whether `BATCH_LENGTH` is always written, or only when the batch
    /// table is non-empty.
    pub batch_length_required: bool,
}

/// Batched 3D model tile: 28-byte header, GLB payload.
pub const B3DM: FormatSpec = FormatSpec {
    name: "b3dm",
    magic: B3DM_MAGIC,
    version: 1,
    header_len: 28,
    embed_flag: false,
    feature_count_semantic: None,
    batch_length_required: true,
};

/// Instanced 3D model tile: 32-byte header with embed flag, GLB or URI
/// payload.
pub const I3DM: FormatSpec = FormatSpec {
    name: "i3dm",
    magic: I3DM_MAGIC,
    version: 1,
    header_len: 32,
    embed_flag: true,
    feature_count_semantic: Some("INSTANCES_LENGTH"),
    batch_length_required: true,
};

/// Point cloud tile: 28-byte header, no model payload.
pub const PNTS: FormatSpec = FormatSpec {
    name: "pnts",
    magic: PNTS_MAGIC,
    version: 1,
    header_len: 28,
    embed_flag: false,
    feature_count_semantic: Some("POINTS_LENGTH"),
    batch_length_required: false,
};

/// Look up the [`FormatSpec`] for a magic, if it names a table-bearing tile.
pub fn spec_for_magic(magic: &[u8; 4]) -> Option<&'static FormatSpec> {
    match magic {
        B3DM_MAGIC => Some(&B3DM),
        I3DM_MAGIC => Some(&I3DM),
        PNTS_MAGIC => Some(&PNTS),
        _ => None,
    }
}

/// True if `magic` names any tile type a composite may contain.
pub fn is_known_tile_magic(magic: &[u8; 4]) -> bool {
    magic == CMPT_MAGIC || spec_for_magic(magic).is_some()
}
