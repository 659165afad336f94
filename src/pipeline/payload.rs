//! Payloads: the data a container carries through the pipeline.
//!
//! The engine never looks inside a payload. It only reads [`Payload::kind`]
//! to check that a node accepts what the previous node produced. Transforms
//! use the typed accessors (`table()`, `array()`) and fail with a readable
//! error when handed the wrong variant.

use crate::error::{FlowError, Result};
use crate::pipeline::store::PayloadStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default store key for table payloads.
pub const TABLE_KEY: &str = "DATAFRAME_CONTAINER";

/// Default store key for array payloads.
pub const ARRAY_KEY: &str = "ARRAY_CONTAINER";

/// Variant tag of a [`Payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    Table,
    Array,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Table => write!(f, "table"),
            PayloadKind::Array => write!(f, "array"),
        }
    }
}

/// One cell of a table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Series(Vec<f64>),
}

impl Cell {
    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            Cell::Series(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v),
            Cell::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Label text for grouping: text as-is, integers formatted.
    pub fn as_label(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::Int(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

/// A table of labeled records, stored column-wise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TablePayload {
    columns: Vec<Column>,
}

impl TablePayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column insert.
    pub fn with_column(mut self, name: impl Into<String>, cells: Vec<Cell>) -> Result<Self> {
        self.set_column(name, cells)?;
        Ok(self)
    }

    /// Number of rows (0 for a table without columns).
    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.cells.len()).unwrap_or(0)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[Cell]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.cells.as_slice())
    }

    /// Replace or append a column. All columns must have the same length.
    pub fn set_column(&mut self, name: impl Into<String>, cells: Vec<Cell>) -> Result<()> {
        let name = name.into();
        let others_rows = self
            .columns
            .iter()
            .find(|c| c.name != name)
            .map(|c| c.cells.len());
        if let Some(rows) = others_rows {
            if rows != cells.len() {
                return Err(FlowError::Payload(format!(
                    "column '{}' has {} rows, table has {}",
                    name,
                    cells.len(),
                    rows
                )));
            }
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => col.cells = cells,
            None => self.columns.push(Column { name, cells }),
        }
        Ok(())
    }

    /// Borrow every row of a series column.
    pub fn series(&self, name: &str) -> anyhow::Result<Vec<&[f64]>> {
        let cells = self
            .column(name)
            .ok_or_else(|| anyhow::anyhow!("no column named '{}'", name))?;
        cells
            .iter()
            .enumerate()
            .map(|(row, cell)| {
                cell.as_series()
                    .ok_or_else(|| anyhow::anyhow!("column '{}' row {} is not a series", name, row))
            })
            .collect()
    }

    /// Append the rows of `other`. Both tables must have the same column names.
    pub fn concat(&mut self, other: &TablePayload) -> Result<()> {
        if self.columns.is_empty() {
            self.columns = other.columns.clone();
            return Ok(());
        }
        let mine: Vec<&str> = self.column_names().collect();
        let theirs: Vec<&str> = other.column_names().collect();
        let mut mine_sorted = mine.clone();
        let mut theirs_sorted = theirs.clone();
        mine_sorted.sort_unstable();
        theirs_sorted.sort_unstable();
        if mine_sorted != theirs_sorted {
            return Err(FlowError::Payload(format!(
                "cannot concatenate tables with columns {:?} and {:?}",
                mine, theirs
            )));
        }
        for col in &mut self.columns {
            if let Some(extra) = other.column(&col.name) {
                col.cells.extend_from_slice(extra);
            }
        }
        Ok(())
    }

    pub fn from_file(path: impl AsRef<Path>, key: &str) -> Result<Self> {
        PayloadStore::new(path.as_ref()).load(key)
    }

    pub fn to_file(&self, path: impl AsRef<Path>, key: &str) -> Result<()> {
        PayloadStore::new(path.as_ref()).save(key, self)
    }
}

/// Rows of numeric values with one label per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayPayload {
    values: Vec<Vec<f64>>,
    labels: Vec<String>,
}

impl ArrayPayload {
    /// Fails unless there is exactly one label per row.
    pub fn new(values: Vec<Vec<f64>>, labels: Vec<String>) -> Result<Self> {
        if values.len() != labels.len() {
            return Err(FlowError::Payload(format!(
                "shape of array ({} rows) and labels ({}) must match exactly",
                values.len(),
                labels.len()
            )));
        }
        Ok(Self { values, labels })
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.values
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn n_rows(&self) -> usize {
        self.values.len()
    }

    pub fn from_file(path: impl AsRef<Path>, key: &str) -> Result<Self> {
        let loaded: ArrayPayload = PayloadStore::new(path.as_ref()).load(key)?;
        // Re-check the shape: the file may have been written by hand.
        Self::new(loaded.values, loaded.labels)
    }

    pub fn to_file(&self, path: impl AsRef<Path>, key: &str) -> Result<()> {
        PayloadStore::new(path.as_ref()).save(key, self)
    }
}

/// The quantity being transformed by a pipeline.
///
/// Stored untagged: a table is `{"columns": ...}`, an array `{"values": ..., "labels": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Table(TablePayload),
    Array(ArrayPayload),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Table(_) => PayloadKind::Table,
            Payload::Array(_) => PayloadKind::Array,
        }
    }

    pub fn table(&self) -> anyhow::Result<&TablePayload> {
        match self {
            Payload::Table(t) => Ok(t),
            other => anyhow::bail!("expected a table payload, got {}", other.kind()),
        }
    }

    pub fn array(&self) -> anyhow::Result<&ArrayPayload> {
        match self {
            Payload::Array(a) => Ok(a),
            other => anyhow::bail!("expected an array payload, got {}", other.kind()),
        }
    }

    /// Store key a payload of this variant is saved under by default.
    pub fn default_key(&self) -> &'static str {
        match self {
            Payload::Table(_) => TABLE_KEY,
            Payload::Array(_) => ARRAY_KEY,
        }
    }

    /// Load whichever variant is stored under `key`.
    pub fn from_file(path: impl AsRef<Path>, key: &str) -> Result<Self> {
        let payload: Payload = PayloadStore::new(path.as_ref()).load(key)?;
        if let Payload::Array(a) = payload {
            return Ok(Payload::Array(ArrayPayload::new(a.values, a.labels)?));
        }
        Ok(payload)
    }

    pub fn to_file(&self, path: impl AsRef<Path>, key: &str) -> Result<()> {
        PayloadStore::new(path.as_ref()).save(key, self)
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Table(TablePayload::default())
    }
}

impl From<TablePayload> for Payload {
    fn from(t: TablePayload) -> Self {
        Payload::Table(t)
    }
}

impl From<ArrayPayload> for Payload {
    fn from(a: ArrayPayload) -> Self {
        Payload::Array(a)
    }
}
