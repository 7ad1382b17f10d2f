//! CSV ingest
//!
//! Parses delimiter-separated tables into typed vertex/edge tables. A
//! column with a declared dtype maps straight onto the matching value
//! variant; undeclared columns fall back to per-cell inference through the
//! dynamic-value bridge. A header row is required since columns are
//! addressed by name.

use crate::protocol::PropertyValue;
use crate::store::{EdgeTable, VertexTable};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::Read;

/// Declared column type, matching the dtype names accepted on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnType {
    Int32,
    Int64,
    Text,
    Bool,
}

impl ColumnType {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "int32" => Ok(ColumnType::Int32),
            "int64" => Ok(ColumnType::Int64),
            "str" | "string" => Ok(ColumnType::Text),
            "bool" => Ok(ColumnType::Bool),
            other => Err(anyhow!(
                "unsupported dtype '{}', expected one of: int32, int64, str, bool",
                other
            )),
        }
    }
}

/// Options shared by vertex and edge loads
#[derive(Clone, Debug)]
pub struct CsvOptions {
    /// Column name -> declared type. Columns left out are type-inferred.
    pub dtypes: HashMap<String, ColumnType>,
    pub has_header: bool,
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            dtypes: HashMap::new(),
            has_header: true,
            delimiter: b',',
        }
    }
}

/// Read a vertex table. The `vertex_col_name` column becomes the vertex id
/// and is not stored as a property.
pub fn read_vertex_table(
    reader: impl Read,
    options: &CsvOptions,
    vertex_col_name: &str,
    type_name: &str,
) -> Result<VertexTable> {
    let (headers, records) = read_records(reader, options)?;
    let vertex_col = column_index(&headers, vertex_col_name)?;

    let mut rows = Vec::with_capacity(records.len());
    for record in &records {
        let vertex_id = parse_id_cell(record.get(vertex_col), vertex_col_name)?;
        let mut properties = HashMap::new();
        for (i, column) in headers.iter().enumerate() {
            if i == vertex_col {
                continue;
            }
            if let Some(cell) = record.get(i) {
                properties.insert(
                    column.to_string(),
                    parse_cell(cell, options.dtypes.get(column).copied(), column)?,
                );
            }
        }
        rows.push((vertex_id, properties));
    }

    Ok(VertexTable {
        type_name: type_name.to_string(),
        rows,
    })
}

/// Read an edge table. The source and destination columns become the edge
/// endpoints and are not stored as properties.
pub fn read_edge_table(
    reader: impl Read,
    options: &CsvOptions,
    src_col_name: &str,
    dst_col_name: &str,
    type_name: &str,
) -> Result<EdgeTable> {
    let (headers, records) = read_records(reader, options)?;
    let src_col = column_index(&headers, src_col_name)?;
    let dst_col = column_index(&headers, dst_col_name)?;

    let mut rows = Vec::with_capacity(records.len());
    for record in &records {
        let src = parse_id_cell(record.get(src_col), src_col_name)?;
        let dst = parse_id_cell(record.get(dst_col), dst_col_name)?;
        let mut properties = HashMap::new();
        for (i, column) in headers.iter().enumerate() {
            if i == src_col || i == dst_col {
                continue;
            }
            if let Some(cell) = record.get(i) {
                properties.insert(
                    column.to_string(),
                    parse_cell(cell, options.dtypes.get(column).copied(), column)?,
                );
            }
        }
        rows.push((src, dst, properties));
    }

    Ok(EdgeTable {
        type_name: type_name.to_string(),
        rows,
    })
}

fn read_records(
    reader: impl Read,
    options: &CsvOptions,
) -> Result<(Vec<String>, Vec<csv::StringRecord>)> {
    if !options.has_header {
        return Err(anyhow!("CSV tables require a header row"));
    }

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
    let mut records = Vec::new();
    for result in rdr.records() {
        records.push(result?);
    }
    Ok((headers, records))
}

fn column_index(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| anyhow!("column '{}' not found in CSV header", name))
}

fn parse_id_cell(cell: Option<&str>, column: &str) -> Result<i64> {
    let cell = cell.ok_or_else(|| anyhow!("missing cell in id column '{}'", column))?;
    cell.trim()
        .parse::<i64>()
        .map_err(|_| anyhow!("failed to parse id for column '{}': '{}'", column, cell))
}

fn parse_cell(cell: &str, dtype: Option<ColumnType>, column: &str) -> Result<PropertyValue> {
    let cell = cell.trim();
    match dtype {
        Some(ColumnType::Int32) => cell
            .parse::<i32>()
            .map(PropertyValue::from)
            .map_err(|_| anyhow!("failed to parse int32 for column '{}': '{}'", column, cell)),
        Some(ColumnType::Int64) => cell
            .parse::<i64>()
            .map(PropertyValue::from)
            .map_err(|_| anyhow!("failed to parse int64 for column '{}': '{}'", column, cell)),
        Some(ColumnType::Text) => Ok(PropertyValue::Text(cell.to_string())),
        Some(ColumnType::Bool) => cell
            .to_lowercase()
            .parse::<bool>()
            .map(PropertyValue::from)
            .map_err(|_| anyhow!("failed to parse bool for column '{}': '{}'", column, cell)),
        None => match serde_json::from_str::<serde_json::Value>(cell) {
            Ok(value) => Ok(PropertyValue::from_json(&value, column)?),
            // Cells that are not JSON scalars are kept as text.
            Err(_) => Ok(PropertyValue::Text(cell.to_string())),
        },
    }
}
