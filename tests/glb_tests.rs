//! Consolidation and GLB emission against real files on disk.

use std::fs;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::json;
use tilepack::glb::{consolidate_document, emit_v1, emit_v2, EmbedOptions, GlbBuilder};

#[test]
fn consolidates_external_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("positions.bin"), [0u8; 10]).unwrap();
    fs::write(dir.path().join("indices.bin"), [1u8; 14]).unwrap();

    let mut doc = json!({
        "asset": {"version": "2.0"},
        "buffers": [
            {"uri": "positions.bin", "byteLength": 10},
            {"uri": "indices.bin", "byteLength": 14},
        ],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 10},
            {"buffer": 1, "byteOffset": 0, "byteLength": 14},
        ],
    });
    let (json_bytes, body) =
        consolidate_document(dir.path(), &mut doc, EmbedOptions::default()).unwrap();

    assert_eq!(body.len(), 24);
    assert_eq!(doc["bufferViews"][0]["byteOffset"], json!(0));
    assert_eq!(doc["bufferViews"][1]["byteOffset"], json!(10));
    assert_eq!(doc["buffers"], json!([{"byteLength": 24}]));

    // Serialized document no longer references the external files
    let text = String::from_utf8(json_bytes).unwrap();
    assert!(!text.contains("positions.bin"));
}

#[test]
fn mixed_data_uri_and_file_buffers() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("mesh.bin"), [9u8; 6]).unwrap();
    let inline = format!("data:application/octet-stream;base64,{}", BASE64.encode([5u8; 4]));

    let mut doc = json!({
        "buffers": [
            {"uri": inline, "byteLength": 4},
            {"uri": "mesh.bin", "byteLength": 6},
        ],
        "bufferViews": [{"buffer": 1, "byteOffset": 2}],
    });
    let (_, body) = consolidate_document(dir.path(), &mut doc, EmbedOptions::default()).unwrap();

    assert_eq!(body.len(), 10);
    // View into buffer 1 is shifted past the 4 inline bytes
    assert_eq!(doc["bufferViews"][0]["byteOffset"], json!(6));
    assert_eq!(body.to_bytes(), [5, 5, 5, 5, 9, 9, 9, 9, 9, 9]);
}

#[test]
fn v1_and_v2_agree_on_body_placement() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), [1u8; 10]).unwrap();
    fs::write(dir.path().join("b.bin"), [2u8; 14]).unwrap();

    let build_doc = || {
        json!({
            "buffers": [
                {"uri": "a.bin", "byteLength": 10},
                {"uri": "b.bin", "byteLength": 14},
            ],
        })
    };

    let mut doc = build_doc();
    let (json_bytes, body) =
        consolidate_document(dir.path(), &mut doc, EmbedOptions::default()).unwrap();

    let v1 = emit_v1(&json_bytes, &body).unwrap();
    let padded_json = u32::from_le_bytes(v1[12..16].try_into().unwrap()) as usize;
    assert_eq!(&v1[20 + padded_json..], body.to_bytes().as_slice());
    assert_eq!(
        u32::from_le_bytes(v1[8..12].try_into().unwrap()) as usize,
        v1.len()
    );

    let v2 = emit_v2(&json_bytes, &body).unwrap();
    assert_eq!(u32::from_le_bytes(v2[4..8].try_into().unwrap()), 2);
    let json_len = u32::from_le_bytes(v2[12..16].try_into().unwrap()) as usize;
    let bin_desc = 12 + 8 + json_len;
    let bin_len = u32::from_le_bytes(v2[bin_desc..bin_desc + 4].try_into().unwrap()) as usize;
    assert_eq!(bin_len, 24); // already a multiple of 4
    assert_eq!(&v2[bin_desc + 8..], body.to_bytes().as_slice());
}

#[test]
fn declared_length_truncation_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("long.bin"), [3u8; 100]).unwrap();

    let mut builder = GlbBuilder::new(dir.path());
    let (offset, length) = builder.add_resource("long.bin", Some(64)).unwrap();
    assert_eq!((offset, length), (0, 64));
    assert_eq!(builder.into_body().len(), 64);
}

#[test]
fn embedded_shader_gets_a_buffer_view() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("buf.bin"), [0u8; 4]).unwrap();
    fs::write(dir.path().join("flat.vert"), b"void main() {}\n").unwrap();

    let mut doc = json!({
        "buffers": [{"uri": "buf.bin", "byteLength": 4}],
        "bufferViews": [{"buffer": 0, "byteOffset": 0, "byteLength": 4}],
        "shaders": [{"uri": "flat.vert", "type": 35633}],
    });
    let embed = EmbedOptions { shaders: true, images: false };
    let (_, body) = consolidate_document(dir.path(), &mut doc, embed).unwrap();

    assert_eq!(body.len(), 4 + 15);
    assert_eq!(doc["shaders"][0].get("uri"), None);
    assert_eq!(doc["shaders"][0]["bufferView"], json!(1));
    assert_eq!(doc["bufferViews"][1]["byteOffset"], json!(4));
    assert_eq!(doc["bufferViews"][1]["byteLength"], json!(15));
}
