//! Dataset abstraction layer for Classilist.
//!
//! This module defines the types a host application hands to the exporter:
//! typed columns, per-record values, and the narrow collaborator traits for
//! record iteration, progress reporting and character output.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io;
use thiserror::Error;

/// Represents an error raised while assembling an in-memory dataset.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetError {
    /// A record does not carry exactly one value per column.
    #[error("record {record} has {found} values, expected {expected}")]
    RecordWidth {
        /// Zero-based position of the offending record.
        record: usize,
        /// Number of columns in the dataset.
        expected: usize,
        /// Number of values in the record.
        found: usize,
    },
}

/// The value type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Categorical values rendered through their string label.
    Nominal,
    /// Double-precision numbers, possibly infinite.
    Numeric,
    /// Integer milliseconds since the Unix epoch.
    DateTime,
}

/// A named, typed column at a fixed position within a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// The column name as produced by the scoring pipeline.
    pub name: String,
    /// The value type stored in this column.
    pub kind: ValueKind,
    /// Position of the column within its dataset.
    #[serde(default)]
    pub index: usize,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self { name: name.into(), kind, index: 0 }
    }

    pub fn nominal(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Nominal)
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Numeric)
    }

    pub fn date_time(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::DateTime)
    }

    /// Returns the same column placed at `index`.
    #[must_use]
    pub fn at(mut self, index: usize) -> Self {
        self.index = index;
        self
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// No value recorded (the host's NaN sentinel).
    Missing,
    Nominal(String),
    Numeric(f64),
    /// Milliseconds since the Unix epoch.
    DateTime(i64),
}

impl Value {
    /// Adapts a host value read through a double accessor.
    ///
    /// Hosts typically store every cell as an `f64` (with NaN meaning
    /// "missing") and expose nominal labels through a separate string
    /// accessor. A nominal cell without a label falls back to the number, and
    /// a date-time cell outside the millisecond range stays numeric.
    pub fn from_raw(kind: ValueKind, raw: f64, label: Option<&str>) -> Self {
        if raw.is_nan() {
            return Self::Missing;
        }
        match kind {
            ValueKind::Nominal => {
                Self::Nominal(label.map_or_else(|| raw.to_string(), str::to_string))
            }
            ValueKind::DateTime if raw.is_finite() && raw >= i64::MIN as f64 && raw < i64::MAX as f64 => {
                Self::DateTime(raw as i64)
            }
            ValueKind::Numeric | ValueKind::DateTime => Self::Numeric(raw),
        }
    }

    /// True for `Missing` and for a NaN numeric.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Numeric(v) => v.is_nan(),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Nominal(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Nominal(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Numeric(value)
    }
}

/// One scored instance; values are aligned with the dataset columns by position.
pub type Record = Vec<Value>;

/// Read access to a scored dataset.
///
/// The exporter needs the ordered column list and a single forward pass over
/// the records. Implementations backed by a host table can yield owned
/// records; in-memory ones can lend them.
pub trait ExampleSet {
    /// The columns in output order.
    fn columns(&self) -> &[Column];

    /// Number of records, when known up front.
    fn len(&self) -> Option<usize> {
        None
    }

    /// Whether the dataset is known to hold no records.
    fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Iterates over the records in order.
    fn records(&self) -> Box<dyn Iterator<Item = Cow<'_, [Value]>> + '_>;
}

/// An in-memory dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
    records: Vec<Record>,
}

impl Dataset {
    /// Creates an empty dataset, re-indexing the columns to their positions.
    pub fn new(columns: Vec<Column>) -> Self {
        let columns = columns.into_iter().enumerate().map(|(idx, c)| c.at(idx)).collect();
        Self { columns, records: Vec::new() }
    }

    /// Appends a record.
    ///
    /// # Errors
    /// Returns `DatasetError::RecordWidth` if the record does not hold one
    /// value per column.
    pub fn push_record(&mut self, record: Record) -> Result<(), DatasetError> {
        if record.len() != self.columns.len() {
            return Err(DatasetError::RecordWidth {
                record: self.records.len(),
                expected: self.columns.len(),
                found: record.len(),
            });
        }
        self.records.push(record);
        Ok(())
    }

    /// Builder-style variant of [`Dataset::push_record`].
    pub fn with_record(mut self, record: Record) -> Result<Self, DatasetError> {
        self.push_record(record)?;
        Ok(self)
    }
}

impl ExampleSet for Dataset {
    fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn len(&self) -> Option<usize> {
        Some(self.records.len())
    }

    fn records(&self) -> Box<dyn Iterator<Item = Cow<'_, [Value]>> + '_> {
        Box::new(self.records.iter().map(|r| Cow::Borrowed(r.as_slice())))
    }
}

/// Progress notifications emitted during an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Emitted once before the first record; `total` is the record count when known.
    Started { total: Option<u64> },
    /// Emitted after each completed batch of records.
    Step { increment: u64 },
    Finished { written: u64 },
}

/// Receives progress for a running export and may request that it stop.
pub trait ProgressSink {
    fn on_event(&self, event: ProgressEvent);

    /// Polled after each progress step; returning `true` aborts the export.
    fn is_stopped(&self) -> bool {
        false
    }
}

/// A character output stream that is already open and positioned.
///
/// Opening and closing is the caller's responsibility; the exporter only
/// writes text and flushes.
pub trait TextSink {
    fn write_text(&mut self, text: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

impl TextSink for String {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.push_str(text);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
