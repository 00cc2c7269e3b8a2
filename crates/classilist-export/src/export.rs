//! Dataset export pipeline: classify, open the destination, serialize.

use crate::classify::{classify, Classification};
use crate::config::{ExportSettings, SerializeOptions};
use crate::encoding::{resolve_encoding, EncodedWriter};
use crate::error::{ExportError, ExportResult};
use crate::serialize::RowSerializer;
use classilist_abstraction::{ExampleSet, ProgressEvent, ProgressSink, TextSink};
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

/// Outcome of a successful file export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub location: PathBuf,
    pub records_written: u64,
}

/// Exports `example_set` to a caller-owned sink.
///
/// Columns are classified before anything is written, so a dataset without
/// the expected roles leaves the sink untouched. Progress receives `Started`
/// with the record count (when known) and `Finished` on success.
pub fn export_to_writer<E, S>(
    example_set: &E,
    options: &SerializeOptions,
    sink: &mut S,
    progress: Option<&dyn ProgressSink>,
) -> ExportResult<u64>
where
    E: ExampleSet + ?Sized,
    S: TextSink + ?Sized,
{
    let classification = classify(example_set.columns())?;
    write_classified(example_set, &classification, options, sink, progress)
}

fn write_classified<E, S>(
    example_set: &E,
    classification: &Classification,
    options: &SerializeOptions,
    sink: &mut S,
    progress: Option<&dyn ProgressSink>,
) -> ExportResult<u64>
where
    E: ExampleSet + ?Sized,
    S: TextSink + ?Sized,
{
    let serializer = RowSerializer::new(options)?;

    if let Some(progress) = progress {
        progress.on_event(ProgressEvent::Started { total: example_set.len().map(|n| n as u64) });
    }
    let written = serializer.write(classification, example_set.records(), sink, progress)?;
    if let Some(progress) = progress {
        progress.on_event(ProgressEvent::Finished { written });
    }
    Ok(written)
}

/// Exports `example_set` to the file named in `settings`.
///
/// The file is opened only once classification, options and encoding check
/// out; it is created (with missing parent directories) if needed and either
/// truncated or appended to. A failed or stopped export leaves the partial
/// file in place.
pub fn export_example_set<E>(
    example_set: &E,
    settings: &ExportSettings,
    progress: Option<&dyn ProgressSink>,
) -> ExportResult<ExportSummary>
where
    E: ExampleSet + ?Sized,
{
    let classification = classify(example_set.columns())?;
    settings.format.validate()?;
    let encoding = resolve_encoding(&settings.encoding)?;

    if let Some(parent) = settings.location.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(settings.append_to_file)
        .truncate(!settings.append_to_file)
        .open(&settings.location)
        .map_err(ExportError::SinkWrite)?;
    let mut writer = EncodedWriter::new(BufWriter::new(file), encoding);

    info!(
        location = %settings.location.display(),
        encoding = writer.encoding().name(),
        append = settings.append_to_file,
        "exporting scored dataset"
    );
    let records_written = write_classified(example_set, &classification, &settings.format, &mut writer, progress)?;
    info!(location = %settings.location.display(), records_written, "export complete");

    Ok(ExportSummary { location: settings.location.clone(), records_written })
}
