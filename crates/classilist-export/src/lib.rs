//! Classilist Export
//!
//! Writes scored classification datasets to delimited text:
//! - Classifying columns into class truth, prediction, probability and feature roles
//! - Serializing the header and records with quoting and value formatting
//! - File-level export with append mode and output encodings
//! - Progress reporting with caller-driven cancellation

pub mod classify;
pub mod config;
pub mod encoding;
pub mod error;
pub mod export;
pub mod progress;
pub mod serialize;

pub use classify::{classify, Classification, ClassifiedColumn, Role};
pub use config::{ExportSettings, SerializeOptions};
pub use encoding::EncodedWriter;
pub use error::{ExportError, ExportResult};
pub use export::{export_example_set, export_to_writer, ExportSummary};
pub use progress::{StopHandle, StoppableProgress, TracingProgressSink};
pub use serialize::{serialize, RowSerializer, PROGRESS_BATCH};

pub use classilist_abstraction::{
    Column, Dataset, DatasetError, ExampleSet, ProgressEvent, ProgressSink, Record, TextSink, Value, ValueKind,
};
