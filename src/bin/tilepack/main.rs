//! tilepack CLI - pack, unpack, and inspect 3D Tiles containers.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::exit;

use tilepack::composite;
use tilepack::glb::{consolidate_document, emit_v1, emit_v2, EmbedOptions};
use tilepack::prelude::*;
use tilepack::tile::format::{spec_for_magic, CMPT_MAGIC};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        print_help();
        return;
    }

    let result = match args[0].as_str() {
        "glb" => cmd_glb(&args[1..]),
        "b3dm" => cmd_b3dm(&args[1..]),
        "i3dm" => cmd_i3dm(&args[1..]),
        "unpack" | "u" => cmd_unpack(&args[1..]),
        "cmpt" => cmd_cmpt(&args[1..]),
        "info" | "i" => cmd_info(&args[1..]),
        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
            exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        exit(1);
    }
}

fn print_help() {
    println!("tilepack - 3D Tiles container tool");
    println!();
    println!("Usage:");
    println!("  tilepack glb <scene.gltf> [--embed] [--v1]   Convert glTF to GLB");
    println!("  tilepack b3dm <model.glb> [--batch <t.json>] Wrap a GLB in a b3dm tile");
    println!("  tilepack i3dm <model.glb> [--features <t.json>] [--batch <t.json>] [--uri]");
    println!("                                               Wrap a GLB (or its URI) in an i3dm tile");
    println!("  tilepack unpack <tile> [out.glb]             Extract a tile's model payload");
    println!("  tilepack cmpt <out.cmpt> <tiles...>          Pack tiles into a composite");
    println!("  tilepack cmpt --unpack <in.cmpt> <outdir>    Unpack a composite");
    println!("  tilepack info <tile>                         Show container header info");
}

fn cmd_glb(args: &[String]) -> Result<()> {
    let mut embed = EmbedOptions::default();
    let mut legacy = false;
    let mut input: Option<&str> = None;
    for arg in args {
        match arg.as_str() {
            "--embed" | "-e" => embed = EmbedOptions::all(),
            "--v1" => legacy = true,
            other => input = Some(other),
        }
    }
    let input = input.ok_or_else(|| Error::schema("missing input .gltf file"))?;
    let path = Path::new(input);

    let text = fs::read(path)?;
    let mut document: serde_json::Value = serde_json::from_slice(&text)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let (json, body) = consolidate_document(base_dir, &mut document, embed)?;
    let out = if legacy {
        emit_v1(&json, &body)?
    } else {
        emit_v2(&json, &body)?
    };

    let out_path = path.with_extension("glb");
    fs::write(&out_path, &out)?;
    println!("{} ({} bytes)", out_path.display(), out.len());
    Ok(())
}

/// Load a table from a JSON file holding either row-wise records (array) or
/// ready-made columns (object).
fn load_table(mut table: PropertyTable, path: &str) -> Result<PropertyTable> {
    let value: serde_json::Value = serde_json::from_slice(&fs::read(path)?)?;
    match value {
        serde_json::Value::Array(rows) => table.load_rows(&rows)?,
        serde_json::Value::Object(columns) => table.load_columns(columns)?,
        other => {
            return Err(Error::schema(format!(
                "table must be an array or object, got {other}"
            )))
        }
    }
    Ok(table)
}

fn cmd_b3dm(args: &[String]) -> Result<()> {
    let mut input: Option<&str> = None;
    let mut batch = PropertyTable::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--batch" | "-b" => {
                let path = iter
                    .next()
                    .ok_or_else(|| Error::schema("--batch needs a file argument"))?;
                batch = load_table(batch, path)?;
            }
            other => input = Some(other),
        }
    }
    let input = input.ok_or_else(|| Error::schema("missing input .glb file"))?;
    let path = Path::new(input);

    let payload = fs::read(path)?;
    let out = tile::encode(
        &B3DM,
        PropertyTable::new(),
        batch,
        Payload::Model(payload),
        0,
        0,
    )?;
    let out_path = path.with_extension("b3dm");
    fs::write(&out_path, &out)?;
    println!("{} ({} bytes)", out_path.display(), out.len());
    Ok(())
}

fn cmd_i3dm(args: &[String]) -> Result<()> {
    let mut input: Option<&str> = None;
    let mut feature = PropertyTable::with_registry(registry());
    let mut batch = PropertyTable::new();
    let mut by_uri = false;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--features" | "-f" => {
                let path = iter
                    .next()
                    .ok_or_else(|| Error::schema("--features needs a file argument"))?;
                feature = load_table(feature, path)?;
            }
            "--batch" | "-b" => {
                let path = iter
                    .next()
                    .ok_or_else(|| Error::schema("--batch needs a file argument"))?;
                batch = load_table(batch, path)?;
            }
            "--uri" | "-u" => by_uri = true,
            other => input = Some(other),
        }
    }
    let input = input.ok_or_else(|| Error::schema("missing input .glb file"))?;
    let path = Path::new(input);

    let payload = if by_uri {
        Payload::Uri(input.to_string())
    } else {
        Payload::Model(fs::read(path)?)
    };
    let out = tile::encode(&I3DM, feature, batch, payload, 0, 0)?;
    let out_path = path.with_extension("i3dm");
    fs::write(&out_path, &out)?;
    println!("{} ({} bytes)", out_path.display(), out.len());
    Ok(())
}

fn cmd_unpack(args: &[String]) -> Result<()> {
    let input = args
        .first()
        .ok_or_else(|| Error::schema("missing input tile file"))?;
    let data = fs::read(input)?;
    if data.len() < 4 {
        return Err(Error::truncated("tile magic", 4, data.len()));
    }
    let magic: [u8; 4] = data[..4].try_into().unwrap();
    let spec = spec_for_magic(&magic).ok_or_else(|| Error::UnknownTileMagic {
        magic: String::from_utf8_lossy(&magic).into_owned(),
    })?;

    let tile = tile::decode(spec, &data)?;
    if tile.embed_flag == Some(0) {
        println!("{}", String::from_utf8(tile.payload)?);
        return Ok(());
    }
    let out_path = match args.get(1) {
        Some(out) => PathBuf::from(out),
        None => PathBuf::from(format!("{input}.glb")),
    };
    fs::write(&out_path, &tile.payload)?;
    println!("{} ({} bytes)", out_path.display(), tile.payload.len());
    Ok(())
}

fn cmd_cmpt(args: &[String]) -> Result<()> {
    if args.first().map(String::as_str) == Some("--unpack") {
        let [input, outdir] = match &args[1..] {
            [a, b] => [a, b],
            _ => return Err(Error::schema("usage: cmpt --unpack <in.cmpt> <outdir>")),
        };
        let data = fs::read(input)?;
        let stem = Path::new(input)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tile".to_string());
        for (index, tile) in composite::unpack(&data)?.iter().enumerate() {
            let ext = String::from_utf8_lossy(&tile.magic).into_owned();
            let out_path = PathBuf::from(outdir).join(format!("{stem}-{index}.{ext}"));
            fs::write(&out_path, &tile.data)?;
            println!("{} ({} bytes)", out_path.display(), tile.data.len());
        }
        return Ok(());
    }

    let (output, inputs) = args
        .split_first()
        .ok_or_else(|| Error::schema("usage: cmpt <out.cmpt> <tiles...>"))?;
    if inputs.is_empty() {
        return Err(Error::schema("at least one input tile must be given"));
    }
    let mut tiles = Vec::with_capacity(inputs.len());
    for input in inputs {
        tiles.push(fs::read(input)?);
    }
    let out = composite::pack(&tiles)?;
    fs::write(output, &out)?;
    println!("{output} ({} bytes, {} tiles)", out.len(), tiles.len());
    Ok(())
}

fn cmd_info(args: &[String]) -> Result<()> {
    let input = args
        .first()
        .ok_or_else(|| Error::schema("missing input file"))?;
    let data = fs::read(input)?;
    if data.len() < 4 {
        return Err(Error::truncated("container magic", 4, data.len()));
    }
    let magic: [u8; 4] = data[..4].try_into().unwrap();

    if let Some(spec) = spec_for_magic(&magic) {
        let tile = tile::decode(spec, &data)?;
        println!("{} version {} ({} bytes)", spec.name, tile.version, tile.length);
        let [fj, fb, bj, bb] = tile.section_lengths();
        println!("  feature table: {fj} B JSON, {fb} B binary");
        println!("  batch table:   {bj} B JSON, {bb} B binary");
        match tile.embed_flag {
            Some(0) => println!("  payload: {} B (external URI)", tile.payload.len()),
            _ => println!("  payload: {} B", tile.payload.len()),
        }
    } else if &magic == CMPT_MAGIC {
        let tiles = composite::unpack(&data)?;
        println!("cmpt ({} bytes, {} tiles)", data.len(), tiles.len());
        for (index, tile) in tiles.iter().enumerate() {
            println!(
                "  [{index}] {} version {} ({} bytes)",
                String::from_utf8_lossy(&tile.magic),
                tile.version,
                tile.length
            );
        }
    } else if &magic == b"glTF" {
        if data.len() < 12 {
            return Err(Error::truncated("glb header", 12, data.len()));
        }
        let version = u32::from_le_bytes(data[4..8].try_into().unwrap());
        let length = u32::from_le_bytes(data[8..12].try_into().unwrap());
        println!("glb version {version} ({length} bytes)");
    } else {
        return Err(Error::UnknownTileMagic {
            magic: String::from_utf8_lossy(&magic).into_owned(),
        });
    }
    Ok(())
}
