//! GLB container emission, both header generations.
//!
//! Version 1 is the legacy 20-byte header followed by space-padded JSON and
//! the raw body. Version 2 is the chunked layout: a 12-byte header, a JSON
//! chunk, and a BIN chunk whose contents are zero-padded to a 4-byte
//! multiple. Both emitters re-check every body part's recorded offset
//! against its actual position in the output; a mismatch means the
//! consolidator miscounted and is reported as an internal invariant failure.

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use tracing::debug;

use crate::glb::consolidate::BodyBuffer;
use crate::tile::format::{
    GLB_CHUNK_BIN, GLB_CHUNK_JSON, GLB_MAGIC, GLB_V1_HEADER_LEN, GLB_V2_HEADER_LEN,
};
use crate::util::{pad_json, padded_len, Error, Result};

fn append_body(out: &mut Vec<u8>, body_start: usize, body: &BodyBuffer) -> Result<()> {
    for (offset, data) in body.parts() {
        if body_start + offset != out.len() {
            return Err(Error::invariant(format!(
                "body part recorded at offset {} lands at {}",
                body_start + offset,
                out.len()
            )));
        }
        out.extend_from_slice(data);
    }
    Ok(())
}

/// Emit a legacy (version 1) GLB container.
pub fn emit_v1(json: &[u8], body: &BodyBuffer) -> Result<Vec<u8>> {
    let mut json = json.to_vec();
    pad_json(&mut json);

    let body_start = GLB_V1_HEADER_LEN + json.len();
    let total = body_start + body.len();

    let mut out = Vec::with_capacity(total);
    out.write_u32::<BigEndian>(GLB_MAGIC)?;
    out.write_u32::<LittleEndian>(1)?;
    out.write_u32::<LittleEndian>(total as u32)?;
    out.write_u32::<LittleEndian>(json.len() as u32)?;
    out.write_u32::<LittleEndian>(0)?; // reserved
    if out.len() != GLB_V1_HEADER_LEN {
        return Err(Error::invariant(format!(
            "glb v1 header is {} bytes, expected {}",
            out.len(),
            GLB_V1_HEADER_LEN
        )));
    }

    out.extend_from_slice(&json);
    append_body(&mut out, body_start, body)?;
    debug!(total, json_len = json.len(), body_len = body.len(), "emitted glb v1");
    Ok(out)
}

/// Emit a current (version 2) GLB container.
///
/// The BIN chunk is omitted entirely when the body is empty.
pub fn emit_v2(json: &[u8], body: &BodyBuffer) -> Result<Vec<u8>> {
    let mut json = json.to_vec();
    pad_json(&mut json);

    let bin_len = padded_len(body.len());
    let mut total = GLB_V2_HEADER_LEN + 8 + json.len();
    if !body.is_empty() {
        total += 8 + bin_len;
    }

    let mut out = Vec::with_capacity(total);
    out.write_u32::<BigEndian>(GLB_MAGIC)?;
    out.write_u32::<LittleEndian>(2)?;
    out.write_u32::<LittleEndian>(total as u32)?;

    out.write_u32::<LittleEndian>(json.len() as u32)?;
    out.write_u32::<LittleEndian>(GLB_CHUNK_JSON)?;
    out.extend_from_slice(&json);

    if !body.is_empty() {
        out.write_u32::<LittleEndian>(bin_len as u32)?;
        out.write_u32::<LittleEndian>(GLB_CHUNK_BIN)?;
        let body_start = out.len();
        append_body(&mut out, body_start, body)?;
        out.resize(body_start + bin_len, 0);
    }

    if out.len() != total {
        return Err(Error::invariant(format!(
            "glb v2 is {} bytes, declared {}",
            out.len(),
            total
        )));
    }
    debug!(total, json_len = json.len(), bin_len, "emitted glb v2");
    Ok(out)
}
