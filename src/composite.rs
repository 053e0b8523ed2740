//! Composite (cmpt) containers.
//!
//! A composite packs already-encoded tiles back to back behind a 16-byte
//! header. There is no index table: each inner tile is self-describing, so
//! unpacking reads the (magic, version, length) prefix of each blob and
//! advances by its declared length. Composites nest — an inner blob may
//! itself be a cmpt.
//!
//! Unrecognized inner magics are kept, not fatal: the length field sits at
//! the same position in every tile generation, so an unknown tile can be
//! carried through opaquely while its siblings decode normally. A declared
//! length that overruns the remaining bytes is always a hard error.

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::{debug, warn};

use crate::tile::format::{
    is_known_tile_magic, CMPT_HEADER_LEN, CMPT_MAGIC, CMPT_VERSION, TILE_PREFIX_LEN,
};
use crate::util::{Cursor, Error, Result};

/// One tile recovered from a composite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerTile {
    pub magic: [u8; 4],
    pub version: u32,
    /// Declared total length of the inner tile.
    pub length: u32,
    /// The complete inner tile, header included.
    pub data: Vec<u8>,
}

impl InnerTile {
    /// True if this entry is itself a composite.
    pub fn is_composite(&self) -> bool {
        &self.magic == CMPT_MAGIC
    }
}

/// Pack encoded tiles into one composite.
///
/// Each blob must begin with a known tile magic (`b3dm`, `i3dm`, `pnts`, or
/// `cmpt`); blobs are copied verbatim in argument order.
pub fn pack<B: AsRef<[u8]>>(tiles: &[B]) -> Result<Vec<u8>> {
    let body_len: usize = tiles.iter().map(|t| t.as_ref().len()).sum();
    let mut out = Vec::with_capacity(CMPT_HEADER_LEN + body_len);

    out.extend_from_slice(CMPT_MAGIC);
    out.write_u32::<LittleEndian>(CMPT_VERSION)?;
    out.write_u32::<LittleEndian>((CMPT_HEADER_LEN + body_len) as u32)?;
    out.write_u32::<LittleEndian>(tiles.len() as u32)?;
    if out.len() != CMPT_HEADER_LEN {
        return Err(Error::invariant(format!(
            "cmpt header is {} bytes, expected {}",
            out.len(),
            CMPT_HEADER_LEN
        )));
    }

    for tile in tiles {
        let tile = tile.as_ref();
        if tile.len() < 4 {
            return Err(Error::truncated("inner tile magic", 4, tile.len()));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&tile[..4]);
        if !is_known_tile_magic(&magic) {
            return Err(Error::UnknownTileMagic {
                magic: String::from_utf8_lossy(&magic).into_owned(),
            });
        }
        out.extend_from_slice(tile);
    }
    debug!(tiles = tiles.len(), bytes = out.len(), "packed composite");
    Ok(out)
}

/// Unpack one level of a composite.
///
/// Returns the inner tiles in container order, each sliced out verbatim.
/// Entries with an unrecognized magic are returned opaquely (a warning is
/// logged) as long as their declared length stays within bounds.
pub fn unpack(data: &[u8]) -> Result<Vec<InnerTile>> {
    let mut cur = Cursor::new(data);

    let magic = cur.read_magic("cmpt magic")?;
    if &magic != CMPT_MAGIC {
        return Err(Error::InvalidMagic {
            expected: String::from_utf8_lossy(CMPT_MAGIC).into_owned(),
            actual: String::from_utf8_lossy(&magic).into_owned(),
        });
    }
    let version = cur.read_u32("cmpt version")?;
    if version > CMPT_VERSION {
        return Err(Error::UnsupportedVersion {
            format: "cmpt".to_string(),
            version,
        });
    }
    let length = cur.read_u32("cmpt length")? as usize;
    let count = cur.read_u32("cmpt tile count")?;
    if length > data.len() {
        return Err(Error::truncated("cmpt body", length, data.len()));
    }

    // Header fields are untrusted; cap the allocation by what the input
    // could possibly hold.
    let possible = cur.remaining() / TILE_PREFIX_LEN;
    let mut tiles = Vec::with_capacity((count as usize).min(possible));
    for index in 0..count {
        let start = cur.pos();
        let inner_magic = cur.read_magic("inner tile magic")?;
        if !is_known_tile_magic(&inner_magic) {
            warn!(
                index,
                magic = %String::from_utf8_lossy(&inner_magic),
                "unrecognized inner tile magic, keeping it opaque"
            );
        }
        let inner_version = cur.read_u32("inner tile version")?;
        let inner_length = cur.read_u32("inner tile length")? as usize;
        if inner_length < TILE_PREFIX_LEN {
            return Err(Error::truncated("inner tile", TILE_PREFIX_LEN, inner_length));
        }
        // Prefix already consumed, slice the rest of the declared span
        let rest = cur.read_slice("inner tile body", inner_length - TILE_PREFIX_LEN)?;
        let mut tile_data = Vec::with_capacity(inner_length);
        tile_data.extend_from_slice(&data[start..start + TILE_PREFIX_LEN]);
        tile_data.extend_from_slice(rest);
        tiles.push(InnerTile {
            magic: inner_magic,
            version: inner_version,
            length: inner_length as u32,
            data: tile_data,
        });
    }
    Ok(tiles)
}

/// Unpack a composite to its atomic tiles, descending into nested composites
/// depth-first.
pub fn unpack_recursive(data: &[u8]) -> Result<Vec<InnerTile>> {
    let mut out = Vec::new();
    for tile in unpack(data)? {
        if tile.is_composite() {
            out.extend(unpack_recursive(&tile.data)?);
        } else {
            out.push(tile);
        }
    }
    Ok(out)
}
