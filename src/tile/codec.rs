//! Tile encode/decode driven by a [`FormatSpec`].
//!
//! One codec serves all three table-bearing formats. Encoding finalizes the
//! two property tables, writes the fixed header field sequence, and
//! concatenates the four sections plus the payload; decoding walks the same
//! layout with an explicit [`Cursor`]. The encoded header is checked against
//! the format's declared constant, so a drifted layout fails loudly instead
//! of producing a subtly corrupt tile.

use byteorder::{LittleEndian, WriteBytesExt};
use serde_json::json;
use tracing::debug;

use crate::table::PropertyTable;
use crate::tile::format::{FormatSpec, BATCH_LENGTH};
use crate::util::{Cursor, Error, Result};

/// Trailing payload of a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// No payload (typical for pnts).
    None,
    /// Embedded binary model, usually a GLB.
    Model(Vec<u8>),
    /// External model reference; i3dm only.
    Uri(String),
}

impl Payload {
    fn bytes(&self) -> &[u8] {
        match self {
            Payload::None => &[],
            Payload::Model(data) => data,
            Payload::Uri(uri) => uri.as_bytes(),
        }
    }

    /// Header embed-flag encoding: 1 = embedded model, 0 = external URI.
    fn embed_flag(&self) -> u32 {
        match self {
            Payload::Uri(_) => 0,
            _ => 1,
        }
    }
}

/// A decoded tile, sections sliced out of the input verbatim.
#[derive(Debug, Clone)]
pub struct DecodedTile {
    pub magic: [u8; 4],
    pub version: u32,
    /// Declared total byte length, header included.
    pub length: u32,
    pub feature_json: Vec<u8>,
    pub feature_bin: Vec<u8>,
    pub batch_json: Vec<u8>,
    pub batch_bin: Vec<u8>,
    /// The i3dm embed flag; `None` for formats without one.
    pub embed_flag: Option<u32>,
    /// Whatever follows the four sections, up to the declared length.
    pub payload: Vec<u8>,
}

impl DecodedTile {
    /// Section byte lengths in header order.
    pub fn section_lengths(&self) -> [usize; 4] {
        [
            self.feature_json.len(),
            self.feature_bin.len(),
            self.batch_json.len(),
            self.batch_bin.len(),
        ]
    }
}

/// Encode one tile.
///
/// `num_features` and `num_batch_features` act as floors: the larger of the
/// argument and the corresponding table's own count is written to the
/// required feature-table globals. Both tables are consumed; payload `Uri` is
/// only legal for formats with an embed flag.
pub fn encode(
    spec: &FormatSpec,
    mut feature_table: PropertyTable,
    batch_table: PropertyTable,
    payload: Payload,
    num_features: usize,
    num_batch_features: usize,
) -> Result<Vec<u8>> {
    if matches!(payload, Payload::Uri(_)) && !spec.embed_flag {
        return Err(Error::schema(format!(
            "{} cannot reference an external model URI",
            spec.name
        )));
    }

    let num_features = num_features.max(feature_table.num_features());
    let num_batch = num_batch_features.max(batch_table.num_features());

    if let Some(semantic) = spec.feature_count_semantic {
        feature_table.add_global(semantic, json!(num_features));
    }
    if spec.batch_length_required || !batch_table.is_empty() {
        feature_table.add_global(BATCH_LENGTH, json!(num_batch));
    }

    let (feature_json, feature_bin) = feature_table.finalize()?;
    let (batch_json, batch_bin) = batch_table.finalize()?;
    let payload_bytes = payload.bytes();

    let total = spec.header_len
        + feature_json.len()
        + feature_bin.len()
        + batch_json.len()
        + batch_bin.len()
        + payload_bytes.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(spec.magic);
    out.write_u32::<LittleEndian>(spec.version)?;
    out.write_u32::<LittleEndian>(total as u32)?;
    out.write_u32::<LittleEndian>(feature_json.len() as u32)?;
    out.write_u32::<LittleEndian>(feature_bin.len() as u32)?;
    out.write_u32::<LittleEndian>(batch_json.len() as u32)?;
    out.write_u32::<LittleEndian>(batch_bin.len() as u32)?;
    if spec.embed_flag {
        out.write_u32::<LittleEndian>(payload.embed_flag())?;
    }

    if out.len() != spec.header_len {
        return Err(Error::invariant(format!(
            "{} header is {} bytes, expected {}",
            spec.name,
            out.len(),
            spec.header_len
        )));
    }

    out.extend_from_slice(&feature_json);
    out.extend_from_slice(&feature_bin);
    out.extend_from_slice(&batch_json);
    out.extend_from_slice(&batch_bin);
    out.extend_from_slice(payload_bytes);
    debug!(
        format = spec.name,
        total,
        num_features,
        num_batch,
        "encoded tile"
    );
    Ok(out)
}

/// Decode one tile of the given format.
pub fn decode(spec: &FormatSpec, data: &[u8]) -> Result<DecodedTile> {
    let mut cur = Cursor::new(data);

    let magic = cur.read_magic("tile magic")?;
    if &magic != spec.magic {
        return Err(Error::InvalidMagic {
            expected: String::from_utf8_lossy(spec.magic).into_owned(),
            actual: String::from_utf8_lossy(&magic).into_owned(),
        });
    }
    let version = cur.read_u32("tile version")?;
    if version > spec.version {
        return Err(Error::UnsupportedVersion {
            format: spec.name.to_string(),
            version,
        });
    }

    let length = cur.read_u32("tile length")?;
    let feature_json_len = cur.read_u32("feature table JSON length")? as usize;
    let feature_bin_len = cur.read_u32("feature table binary length")? as usize;
    let batch_json_len = cur.read_u32("batch table JSON length")? as usize;
    let batch_bin_len = cur.read_u32("batch table binary length")? as usize;
    let embed_flag = if spec.embed_flag {
        Some(cur.read_u32("embed flag")?)
    } else {
        None
    };

    let sections = feature_json_len + feature_bin_len + batch_json_len + batch_bin_len;
    let payload_len = (length as usize)
        .checked_sub(spec.header_len + sections)
        .ok_or_else(|| {
            Error::truncated(
                format!("{} sections", spec.name),
                spec.header_len + sections,
                length as usize,
            )
        })?;

    let feature_json = cur.read_slice("feature table JSON", feature_json_len)?;
    let feature_bin = cur.read_slice("feature table binary", feature_bin_len)?;
    let batch_json = cur.read_slice("batch table JSON", batch_json_len)?;
    let batch_bin = cur.read_slice("batch table binary", batch_bin_len)?;
    let payload = cur.read_slice("tile payload", payload_len)?;

    Ok(DecodedTile {
        magic,
        version,
        length,
        feature_json: feature_json.to_vec(),
        feature_bin: feature_bin.to_vec(),
        batch_json: batch_json.to_vec(),
        batch_bin: batch_bin.to_vec(),
        embed_flag,
        payload: payload.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::registry;
    use crate::tile::format::{B3DM, I3DM, PNTS};
    use serde_json::json;

    fn batch_table() -> PropertyTable {
        let mut t = PropertyTable::new();
        t.load_rows(&[json!({"height": 10}), json!({"height": 12})])
            .unwrap();
        t
    }

    #[test]
    fn test_b3dm_round_trip() {
        let payload = b"glTF fake payload 123".to_vec();
        let encoded = encode(
            &B3DM,
            PropertyTable::new(),
            batch_table(),
            Payload::Model(payload.clone()),
            0,
            0,
        )
        .unwrap();

        let tile = decode(&B3DM, &encoded).unwrap();
        assert_eq!(&tile.magic, b"b3dm");
        assert_eq!(tile.version, 1);
        assert_eq!(tile.length as usize, encoded.len());
        assert_eq!(tile.payload, payload);
        assert_eq!(tile.embed_flag, None);
        for len in tile.section_lengths() {
            assert_eq!(len % 4, 0);
        }
    }

    #[test]
    fn test_b3dm_writes_batch_length() {
        let encoded = encode(
            &B3DM,
            PropertyTable::new(),
            batch_table(),
            Payload::None,
            0,
            0,
        )
        .unwrap();
        let tile = decode(&B3DM, &encoded).unwrap();
        let text = std::str::from_utf8(&tile.feature_json).unwrap();
        let v: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(v["BATCH_LENGTH"], json!(2));
    }

    #[test]
    fn test_i3dm_embed_flag() {
        let encoded = encode(
            &I3DM,
            PropertyTable::new(),
            PropertyTable::new(),
            Payload::Uri("model.glb".into()),
            4,
            0,
        )
        .unwrap();
        let tile = decode(&I3DM, &encoded).unwrap();
        assert_eq!(tile.embed_flag, Some(0));
        assert_eq!(tile.payload, b"model.glb");

        let text = std::str::from_utf8(&tile.feature_json).unwrap();
        let v: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(v["INSTANCES_LENGTH"], json!(4));

        let embedded = encode(
            &I3DM,
            PropertyTable::new(),
            PropertyTable::new(),
            Payload::Model(b"glbb".to_vec()),
            4,
            0,
        )
        .unwrap();
        assert_eq!(decode(&I3DM, &embedded).unwrap().embed_flag, Some(1));
    }

    #[test]
    fn test_uri_rejected_outside_i3dm() {
        let err = encode(
            &B3DM,
            PropertyTable::new(),
            PropertyTable::new(),
            Payload::Uri("model.glb".into()),
            0,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_pnts_with_binary_positions() {
        let mut feature = PropertyTable::with_registry(registry());
        let cols = json!({"POSITION": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]});
        feature
            .load_columns(cols.as_object().unwrap().clone())
            .unwrap();

        let encoded = encode(&PNTS, feature, PropertyTable::new(), Payload::None, 0, 0).unwrap();
        let tile = decode(&PNTS, &encoded).unwrap();
        // 2 points * vec3 * f32 = 24 bytes
        assert_eq!(tile.feature_bin.len(), 24);

        let text = std::str::from_utf8(&tile.feature_json).unwrap();
        let v: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(v["POINTS_LENGTH"], json!(2));
        assert_eq!(v["POSITION"], json!({"byteOffset": 0}));
        // Empty batch table, so no BATCH_LENGTH
        assert!(v.get("BATCH_LENGTH").is_none());
    }

    #[test]
    fn test_header_length_constants() {
        for spec in [&B3DM, &I3DM, &PNTS] {
            let encoded = encode(
                spec,
                PropertyTable::new(),
                PropertyTable::new(),
                Payload::None,
                1,
                0,
            )
            .unwrap();
            let tile = decode(spec, &encoded).unwrap();
            let sections: usize = tile.section_lengths().iter().sum();
            assert_eq!(encoded.len(), spec.header_len + sections);
        }
    }

    #[test]
    fn test_decode_wrong_magic() {
        let encoded = encode(
            &B3DM,
            PropertyTable::new(),
            PropertyTable::new(),
            Payload::None,
            0,
            0,
        )
        .unwrap();
        let err = decode(&PNTS, &encoded).unwrap_err();
        assert!(matches!(err, Error::InvalidMagic { .. }));
    }

    #[test]
    fn test_decode_future_version() {
        let mut encoded = encode(
            &B3DM,
            PropertyTable::new(),
            PropertyTable::new(),
            Payload::None,
            0,
            0,
        )
        .unwrap();
        encoded[4..8].copy_from_slice(&2u32.to_le_bytes());
        let err = decode(&B3DM, &encoded).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { version: 2, .. }));
    }

    #[test]
    fn test_decode_truncated() {
        let encoded = encode(
            &B3DM,
            PropertyTable::new(),
            batch_table(),
            Payload::Model(b"payload!".to_vec()),
            0,
            0,
        )
        .unwrap();
        let err = decode(&B3DM, &encoded[..encoded.len() - 4]).unwrap_err();
        assert!(matches!(err, Error::Truncated { .. }));
    }
}
