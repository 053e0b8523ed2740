//! Property tables.
//!
//! A [`PropertyTable`] is the column store behind both the feature table and
//! the batch table of every tile format: an ordered mapping from property
//! name to one value per feature, plus table-wide scalar globals. Ingestion
//! accepts row-wise records (transposed on the fly), sparse indexed records,
//! or ready-made columns.
//!
//! [`PropertyTable::finalize`] consumes the table and produces the
//! `(jsonBytes, binBytes)` section pair every tile header points at. In
//! binary mode, columns whose name resolves in the
//! [`SemanticRegistry`](crate::semantic::SemanticRegistry) are emitted as
//! typed little-endian data in the binary section and referenced from the
//! JSON by `byteOffset`; everything else is embedded as plain JSON. Consuming
//! `self` makes the one-shot lifecycle a compile-time fact: a finalized table
//! cannot be reloaded.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::semantic::SemanticRegistry;
use crate::util::{pad_binary, pad_json, Error, Result};

/// Column store for one feature or batch table.
#[derive(Debug, Default)]
pub struct PropertyTable {
    columns: BTreeMap<String, Vec<Value>>,
    globals: BTreeMap<String, Value>,
    num_features: usize,
    registry: Option<&'static SemanticRegistry>,
}

impl PropertyTable {
    /// Create a table that embeds every property as JSON.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table that binary-encodes registry-resolved properties.
    pub fn with_registry(registry: &'static SemanticRegistry) -> Self {
        Self {
            registry: Some(registry),
            ..Self::default()
        }
    }

    /// Number of features (rows) ingested so far.
    #[inline]
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// True if no columns and no globals have been ingested.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.globals.is_empty()
    }

    /// Ingest row-wise records, transposing them to columns.
    ///
    /// Each record must be a JSON object. A key first observed at record `i`
    /// gets nulls back-filled for records `0..i`; keys absent from a record
    /// contribute a null for that record.
    pub fn load_rows(&mut self, rows: &[Value]) -> Result<()> {
        for row in rows {
            let obj = row
                .as_object()
                .ok_or_else(|| Error::schema(format!("row is not an object: {row}")))?;
            self.push_row(obj);
        }
        Ok(())
    }

    /// Ingest sparse records keyed by explicit feature index.
    ///
    /// Feature count becomes one past the maximum index; indexes with no
    /// record hold nulls in every column.
    pub fn load_indexed_rows(&mut self, rows: &Map<String, Value>) -> Result<()> {
        let mut indexed: Vec<(usize, &Map<String, Value>)> = Vec::with_capacity(rows.len());
        let mut max_index = 0usize;
        for (key, row) in rows {
            let index: usize = key
                .parse()
                .map_err(|_| Error::schema(format!("non-numeric feature index {key:?}")))?;
            let obj = row
                .as_object()
                .ok_or_else(|| Error::schema(format!("record {key:?} is not an object")))?;
            max_index = max_index.max(index);
            indexed.push((index, obj));
        }
        if indexed.is_empty() {
            return Ok(());
        }

        let count = self.num_features.max(max_index + 1);
        self.grow_to(count);
        for (index, obj) in indexed {
            for (key, val) in obj {
                let col = self
                    .columns
                    .entry(key.clone())
                    .or_insert_with(|| vec![Value::Null; count]);
                col[index] = val.clone();
            }
        }
        Ok(())
    }

    /// Adopt a column map directly.
    ///
    /// Every column must be an array, and all columns (including any already
    /// present) must agree on the feature count; a shorter column is a
    /// [`Error::ColumnLengthMismatch`], never silently trusted.
    pub fn load_columns(&mut self, columns: Map<String, Value>) -> Result<()> {
        for (name, value) in columns {
            let col = match value {
                Value::Array(items) => items,
                other => {
                    return Err(Error::schema(format!(
                        "column {name:?} is not an array: {other}"
                    )))
                }
            };
            if self.columns.is_empty() && self.num_features == 0 {
                self.num_features = col.len();
            } else if col.len() != self.num_features {
                return Err(Error::ColumnLengthMismatch {
                    name,
                    expected: self.num_features,
                    actual: col.len(),
                });
            }
            self.columns.insert(name, col);
        }
        Ok(())
    }

    /// Attach a table-wide scalar, merged at the top level of the JSON.
    pub fn add_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    fn push_row(&mut self, row: &Map<String, Value>) {
        let index = self.num_features;
        for (key, val) in row {
            let col = self
                .columns
                .entry(key.clone())
                .or_insert_with(|| vec![Value::Null; index]);
            col.push(val.clone());
        }
        self.num_features += 1;
        // Null out this record in columns the row did not mention
        let count = self.num_features;
        for col in self.columns.values_mut() {
            if col.len() < count {
                col.push(Value::Null);
            }
        }
    }

    fn grow_to(&mut self, count: usize) {
        for col in self.columns.values_mut() {
            col.resize(count, Value::Null);
        }
        self.num_features = count;
    }

    /// Serialize the table to its `(jsonBytes, binBytes)` section pair.
    ///
    /// Keys are emitted sorted and compact, so equal tables produce equal
    /// bytes. Both buffers come back padded to a 4-byte multiple (JSON with
    /// spaces, binary with zeros). An empty table yields two empty buffers.
    pub fn finalize(self) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut out = Map::new();
        let mut bin = Vec::new();

        for (name, col) in self.columns {
            let resolved = self
                .registry
                .and_then(|registry| registry.get(&name).map(|ty| (registry, ty)));
            match resolved {
                Some((registry, ty)) => {
                    // Columns start aligned to their component width
                    let width = ty.byte_width();
                    while bin.len() % width != 0 {
                        bin.push(0);
                    }
                    let offset = bin.len();
                    let encoded = registry.encode_value(&name, &Value::Array(col))?;
                    bin.extend_from_slice(&encoded);
                    out.insert(name, json!({ "byteOffset": offset }));
                }
                None => {
                    out.insert(name, Value::Array(col));
                }
            }
        }

        for (name, value) in self.globals {
            if out.contains_key(&name) {
                return Err(Error::schema(format!(
                    "global {name:?} collides with a per-feature column"
                )));
            }
            out.insert(name, value);
        }

        let mut json = if out.is_empty() {
            Vec::new()
        } else {
            serde_json::to_vec(&Value::Object(out))?
        };
        pad_json(&mut json);
        pad_binary(&mut bin);
        debug!(json_len = json.len(), bin_len = bin.len(), "finalized property table");
        Ok((json, bin))
    }
}
