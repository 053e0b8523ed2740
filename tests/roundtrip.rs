//! Round-trip tests across the tile formats and the composite container.

use serde_json::json;
use tilepack::composite;
use tilepack::prelude::*;

fn batch_rows() -> Vec<serde_json::Value> {
    vec![
        json!({"name": "roof", "height": 10.5}),
        json!({"name": "wall", "height": 3.0, "material": "brick"}),
        json!({"name": "door"}),
    ]
}

fn encode_b3dm(payload: &[u8]) -> Vec<u8> {
    let mut batch = PropertyTable::new();
    batch.load_rows(&batch_rows()).unwrap();
    tile::encode(
        &B3DM,
        PropertyTable::new(),
        batch,
        Payload::Model(payload.to_vec()),
        0,
        0,
    )
    .unwrap()
}

#[test]
fn b3dm_round_trip_preserves_sections_and_payload() {
    let payload = b"glTF\x02\x00\x00\x00 pretend model".to_vec();
    let encoded = encode_b3dm(&payload);
    let tile = tile::decode(&B3DM, &encoded).unwrap();

    assert_eq!(tile.payload, payload);
    assert_eq!(tile.length as usize, encoded.len());
    let sections: usize = tile.section_lengths().iter().sum();
    assert_eq!(encoded.len(), B3DM.header_len + sections + payload.len());
    for len in tile.section_lengths() {
        assert_eq!(len % 4, 0, "sections must stay 4-byte aligned");
    }
}

#[test]
fn independent_encodes_are_byte_identical() {
    let payload = b"same payload".to_vec();
    assert_eq!(encode_b3dm(&payload), encode_b3dm(&payload));
}

#[test]
fn i3dm_instance_table_round_trip() {
    let mut feature = PropertyTable::with_registry(registry());
    let cols = json!({
        "POSITION": [[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [0.0, 10.0, 0.0]],
    });
    feature.load_columns(cols.as_object().unwrap().clone()).unwrap();

    let encoded = tile::encode(
        &I3DM,
        feature,
        PropertyTable::new(),
        Payload::Model(b"glTF payload".to_vec()),
        0,
        0,
    )
    .unwrap();
    let tile = tile::decode(&I3DM, &encoded).unwrap();
    assert_eq!(tile.embed_flag, Some(1));
    // 3 instances * vec3 * f32
    assert_eq!(tile.feature_bin.len(), 36);

    let text = std::str::from_utf8(&tile.feature_json).unwrap();
    let table: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
    assert_eq!(table["INSTANCES_LENGTH"], json!(3));
    assert_eq!(table["POSITION"], json!({"byteOffset": 0}));
}

#[test]
fn pnts_quantized_points_round_trip() {
    let mut feature = PropertyTable::with_registry(registry());
    let cols = json!({
        "POSITION_QUANTIZED": [[0, 0, 0], [65535, 0, 32768]],
        "RGB": [[255, 0, 0], [0, 255, 0]],
    });
    feature.load_columns(cols.as_object().unwrap().clone()).unwrap();

    let encoded =
        tile::encode(&PNTS, feature, PropertyTable::new(), Payload::None, 0, 0).unwrap();
    let tile = tile::decode(&PNTS, &encoded).unwrap();
    assert!(tile.payload.is_empty());

    let text = std::str::from_utf8(&tile.feature_json).unwrap();
    let table: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
    assert_eq!(table["POINTS_LENGTH"], json!(2));
    // Both semantics moved to the binary section
    assert!(table["POSITION_QUANTIZED"]["byteOffset"].is_number());
    assert!(table["RGB"]["byteOffset"].is_number());
    assert_eq!(tile.feature_bin.len() % 4, 0);
}

#[test]
fn composite_nesting_recovers_atomic_tiles() {
    let a = encode_b3dm(b"tile a");
    let b = encode_b3dm(b"tile b");

    let inner_a = composite::pack(&[&a]).unwrap();
    let inner_b = composite::pack(&[&b]).unwrap();
    let outer = composite::pack(&[&inner_a, &inner_b]).unwrap();
    assert_eq!(&outer[..4], b"cmpt");

    let atoms = composite::unpack_recursive(&outer).unwrap();
    assert_eq!(atoms.len(), 2);
    assert_eq!(atoms[0].data, a);
    assert_eq!(atoms[1].data, b);
}

#[test]
fn glb_output_rides_inside_b3dm() {
    let (json, body) = {
        let mut doc = json!({
            "asset": {"version": "2.0"},
            "buffers": [],
        });
        consolidate_document(".", &mut doc, EmbedOptions::default()).unwrap()
    };
    let glb = emit_v2(&json, &body).unwrap();

    let encoded = tile::encode(
        &B3DM,
        PropertyTable::new(),
        PropertyTable::new(),
        Payload::Model(glb.clone()),
        0,
        0,
    )
    .unwrap();
    let tile = tile::decode(&B3DM, &encoded).unwrap();
    assert_eq!(tile.payload, glb);
    assert_eq!(&tile.payload[..4], b"glTF");
}
