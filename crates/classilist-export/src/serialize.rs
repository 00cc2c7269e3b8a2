//! Delimited-text row serializer.

use crate::classify::Classification;
use crate::config::SerializeOptions;
use crate::error::{ExportError, ExportResult};
use chrono::DateTime;
use classilist_abstraction::{ProgressEvent, ProgressSink, TextSink, Value, ValueKind};
use std::fmt::Write as _;
use tracing::debug;

/// Records written between progress steps.
pub const PROGRESS_BATCH: u64 = 100;

/// Writes a classified dataset as delimited text.
#[derive(Debug)]
pub struct RowSerializer<'a> {
    options: &'a SerializeOptions,
    negative_infinity: Option<String>,
}

impl<'a> RowSerializer<'a> {
    pub fn new(options: &'a SerializeOptions) -> ExportResult<Self> {
        options.validate()?;
        let negative_infinity = options.infinity_symbol.as_ref().map(|s| format!("-{s}"));
        Ok(Self { options, negative_infinity })
    }

    /// Wrap in double quotes, replacing embedded double quotes with single quotes.
    fn quote(value: &str) -> String {
        format!("\"{}\"", value.replace('"', "'"))
    }

    /// The header line, without terminator. Names are always quoted.
    pub fn header_line(&self, classification: &Classification) -> String {
        classification
            .output_names()
            .map(Self::quote)
            .collect::<Vec<_>>()
            .join(&self.options.column_separator)
    }

    /// Appends one record's fields, without terminator, to `out`.
    pub fn format_record(&self, classification: &Classification, values: &[Value], out: &mut String) {
        for (idx, (column, value)) in classification.columns.iter().zip(values).enumerate() {
            if idx > 0 {
                out.push_str(&self.options.column_separator);
            }
            self.push_value(column.column.kind, value, out);
        }
    }

    fn push_value(&self, kind: ValueKind, value: &Value, out: &mut String) {
        if value.is_missing() {
            return;
        }
        match value {
            Value::Missing => {}
            Value::Nominal(s) => self.push_nominal(s, out),
            Value::DateTime(ms) => self.push_date_time(*ms, out),
            Value::Numeric(v) if kind == ValueKind::DateTime && Self::fits_millis(*v) => {
                self.push_date_time(*v as i64, out);
            }
            Value::Numeric(v) => self.push_numeric(*v, out),
        }
    }

    /// Whether a numeric date-time value converts to milliseconds without saturating.
    /// Other values are written as plain numbers.
    fn fits_millis(value: f64) -> bool {
        value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64
    }

    fn push_nominal(&self, value: &str, out: &mut String) {
        if self.options.quote_nominal_values {
            out.push_str(&Self::quote(value));
        } else {
            out.push_str(value);
        }
    }

    fn push_date_time(&self, millis: i64, out: &mut String) {
        if !self.options.format_date_attributes {
            let _ = write!(out, "{millis}");
            return;
        }
        match DateTime::from_timestamp_millis(millis) {
            Some(dt) => {
                let _ = write!(out, "{}", dt.format(&self.options.date_format));
            }
            None => {
                let _ = write!(out, "{millis}");
            }
        }
    }

    fn push_numeric(&self, value: f64, out: &mut String) {
        if value.is_infinite() {
            let symbol = if value > 0.0 {
                self.options.infinity_symbol.as_deref()
            } else {
                self.negative_infinity.as_deref()
            };
            if let Some(symbol) = symbol {
                out.push_str(symbol);
                return;
            }
        }
        let _ = write!(out, "{value}");
    }

    /// Writes the header (when enabled) and every record, then flushes.
    ///
    /// Emits a progress step after every [`PROGRESS_BATCH`] records; records
    /// past the last full batch are not reported. A stop request observed at
    /// a step aborts with `StoppedByCaller` after flushing what was written.
    ///
    /// Returns the number of records written.
    pub fn write<I, R, S>(
        &self,
        classification: &Classification,
        records: I,
        sink: &mut S,
        progress: Option<&dyn ProgressSink>,
    ) -> ExportResult<u64>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[Value]>,
        S: TextSink + ?Sized,
    {
        if self.options.write_attribute_names {
            let mut header = self.header_line(classification);
            header.push('\n');
            sink.write_text(&header)?;
        }

        let width = classification.len();
        let mut written: u64 = 0;
        let mut line = String::new();
        for record in records {
            let values = record.as_ref();
            if values.len() != width {
                sink.flush()?;
                return Err(ExportError::RecordWidth { record: written, expected: width, found: values.len() });
            }

            line.clear();
            self.format_record(classification, values, &mut line);
            line.push('\n');
            sink.write_text(&line)?;
            written += 1;

            if let Some(progress) = progress {
                if written % PROGRESS_BATCH == 0 {
                    progress.on_event(ProgressEvent::Step { increment: PROGRESS_BATCH });
                    if progress.is_stopped() {
                        sink.flush()?;
                        debug!(written, "export stopped by caller");
                        return Err(ExportError::StoppedByCaller);
                    }
                }
            }
        }

        sink.flush()?;
        debug!(written, "records serialized");
        Ok(written)
    }
}

/// Serializes a classified dataset to `sink`. See [`RowSerializer::write`].
pub fn serialize<I, R, S>(
    classification: &Classification,
    records: I,
    options: &SerializeOptions,
    sink: &mut S,
    progress: Option<&dyn ProgressSink>,
) -> ExportResult<u64>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[Value]>,
    S: TextSink + ?Sized,
{
    RowSerializer::new(options)?.write(classification, records, sink, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use classilist_abstraction::Column;
    use std::cell::RefCell;
    use std::io;

    fn columns() -> Vec<Column> {
        vec![
            Column::nominal("Species"),
            Column::nominal("prediction(Species)"),
            Column::numeric("confidence(setosa)"),
            Column::numeric("confidence(versicolor)"),
            Column::numeric("petal_length"),
        ]
    }

    fn record(petal_length: Value) -> Vec<Value> {
        vec!["setosa".into(), "setosa".into(), 0.9.into(), 0.1.into(), petal_length]
    }

    fn render(options: &SerializeOptions, records: &[Vec<Value>]) -> String {
        let classification = classify(&columns()).unwrap();
        let mut out = String::new();
        serialize(&classification, records, options, &mut out, None).unwrap();
        out
    }

    fn data_lines(output: &str) -> Vec<&str> {
        output.lines().skip(1).collect()
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: RefCell<Vec<ProgressEvent>>,
        stop_after_steps: Option<usize>,
    }

    impl ProgressSink for RecordingProgress {
        fn on_event(&self, event: ProgressEvent) {
            self.events.borrow_mut().push(event);
        }

        fn is_stopped(&self) -> bool {
            self.stop_after_steps.is_some_and(|n| self.events.borrow().len() >= n)
        }
    }

    struct FailingSink;

    impl TextSink for FailingSink {
        fn write_text(&mut self, _text: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_iris_header_and_record() {
        let out = render(&SerializeOptions::default(), &[record(1.4.into())]);
        assert_eq!(
            out,
            "\"A-Species\",\"Predicted\",\"P-setosa\",\"P-versicolor\",\"F-petal_length\"\n\
             \"setosa\",\"setosa\",0.9,0.1,1.4\n"
        );
    }

    #[test]
    fn test_header_can_be_disabled() {
        let options = SerializeOptions::default().with_write_attribute_names(false);
        let out = render(&options, &[record(1.4.into())]);
        assert_eq!(out, "\"setosa\",\"setosa\",0.9,0.1,1.4\n");
    }

    #[test]
    fn test_custom_separator() {
        let options = SerializeOptions::default().with_separator(";");
        let out = render(&options, &[record(1.0.into())]);
        assert!(out.starts_with("\"A-Species\";\"Predicted\";"));
        assert_eq!(data_lines(&out), vec!["\"setosa\";\"setosa\";0.9;0.1;1"]);
    }

    #[test]
    fn test_nominal_quotes_become_single_quotes() {
        let mut r = record(1.4.into());
        r[0] = Value::from(r#"He said "hi""#);
        let out = render(&SerializeOptions::default(), &[r]);
        assert!(data_lines(&out)[0].starts_with(r#""He said 'hi'","setosa""#));
    }

    #[test]
    fn test_unquoted_nominal_is_raw() {
        let mut r = record(1.4.into());
        r[0] = Value::from(r#"He said "hi""#);
        let options = SerializeOptions::default().with_quote_nominal_values(false);
        let out = render(&options, &[r]);
        assert_eq!(data_lines(&out), vec![r#"He said "hi",setosa,0.9,0.1,1.4"#]);
        assert!(out.starts_with("\"A-Species\""));
    }

    #[test]
    fn test_header_names_replace_double_quotes() {
        let columns = vec![
            Column::nominal("y"),
            Column::nominal("prediction(y)"),
            Column::numeric("confidence(a)"),
            Column::numeric("size \"cm\""),
        ];
        let classification = classify(&columns).unwrap();
        let options = SerializeOptions::default();
        let serializer = RowSerializer::new(&options).unwrap();
        assert_eq!(serializer.header_line(&classification), "\"A-y\",\"Predicted\",\"P-a\",\"F-size 'cm'\"");
    }

    #[test]
    fn test_missing_values_are_empty_fields() {
        let r = vec![Value::Missing, Value::Missing, Value::Numeric(f64::NAN), Value::Missing, Value::Missing];
        let out = render(&SerializeOptions::default(), &[r]);
        assert_eq!(data_lines(&out), vec![",,,,"]);
    }

    #[test]
    fn test_infinity_symbol() {
        let options = SerializeOptions::default().with_infinity_symbol("Infinity");
        let out = render(&options, &[record(f64::INFINITY.into()), record(f64::NEG_INFINITY.into())]);
        let lines = data_lines(&out);
        assert!(lines[0].ends_with(",Infinity"));
        assert!(lines[1].ends_with(",-Infinity"));
    }

    #[test]
    fn test_infinity_without_symbol_uses_default_formatting() {
        let out = render(&SerializeOptions::default(), &[record(f64::INFINITY.into()), record(f64::NEG_INFINITY.into())]);
        let lines = data_lines(&out);
        assert!(lines[0].ends_with(",inf"));
        assert!(lines[1].ends_with(",-inf"));
    }

    #[test]
    fn test_date_time_values() {
        let columns = vec![
            Column::nominal("y"),
            Column::nominal("prediction(y)"),
            Column::numeric("confidence(a)"),
            Column::date_time("scored_at"),
        ];
        let classification = classify(&columns).unwrap();
        let records = vec![
            vec!["a".into(), "a".into(), 1.0.into(), Value::DateTime(1_600_000_000_000)],
            vec!["a".into(), "a".into(), 1.0.into(), Value::Numeric(1_600_000_000_000.0)],
        ];

        let mut formatted = String::new();
        serialize(&classification, &records, &SerializeOptions::default(), &mut formatted, None).unwrap();
        assert_eq!(data_lines(&formatted), vec!["\"a\",\"a\",1,9/13/20 12:26 PM", "\"a\",\"a\",1,9/13/20 12:26 PM"]);

        let mut raw = String::new();
        let options = SerializeOptions::default().with_format_date_attributes(false);
        serialize(&classification, &records, &options, &mut raw, None).unwrap();
        assert_eq!(data_lines(&raw), vec!["\"a\",\"a\",1,1600000000000", "\"a\",\"a\",1,1600000000000"]);
    }

    #[test]
    fn test_out_of_range_date_falls_back_to_millis() {
        let columns = vec![
            Column::nominal("y"),
            Column::nominal("prediction(y)"),
            Column::numeric("confidence(a)"),
            Column::date_time("t"),
        ];
        let classification = classify(&columns).unwrap();
        let mut out = String::new();
        let records = vec![vec!["a".into(), "a".into(), 1.0.into(), Value::DateTime(i64::MAX)]];
        serialize(&classification, &records, &SerializeOptions::default(), &mut out, None).unwrap();
        assert!(out.ends_with(&format!(",{}\n", i64::MAX)));
    }

    #[test]
    fn test_non_finite_numeric_in_date_column_is_written_as_number() {
        let columns = vec![
            Column::nominal("y"),
            Column::nominal("prediction(y)"),
            Column::numeric("confidence(a)"),
            Column::date_time("t"),
        ];
        let classification = classify(&columns).unwrap();
        let records = vec![
            vec!["a".into(), "a".into(), 1.0.into(), Value::Numeric(f64::INFINITY)],
            vec!["a".into(), "a".into(), 1.0.into(), Value::Numeric(f64::NEG_INFINITY)],
            vec!["a".into(), "a".into(), 1.0.into(), Value::Numeric(1e300)],
        ];

        let mut plain = String::new();
        serialize(&classification, &records, &SerializeOptions::default(), &mut plain, None).unwrap();
        let huge = format!("\"a\",\"a\",1,{}", 1e300);
        assert_eq!(data_lines(&plain), vec!["\"a\",\"a\",1,inf", "\"a\",\"a\",1,-inf", huge.as_str()]);

        let mut symbol = String::new();
        let options = SerializeOptions::default().with_infinity_symbol("Infinity");
        serialize(&classification, &records[..2], &options, &mut symbol, None).unwrap();
        assert_eq!(data_lines(&symbol), vec!["\"a\",\"a\",1,Infinity", "\"a\",\"a\",1,-Infinity"]);
    }

    #[test]
    fn test_progress_steps_every_hundred_records() {
        let records: Vec<_> = (0..250).map(|_| record(1.4.into())).collect();
        let classification = classify(&columns()).unwrap();
        let progress = RecordingProgress::default();
        let mut out = String::new();

        let written =
            serialize(&classification, &records, &SerializeOptions::default(), &mut out, Some(&progress)).unwrap();

        assert_eq!(written, 250);
        assert_eq!(out.lines().count(), 251);
        assert_eq!(
            progress.events.borrow().as_slice(),
            &[ProgressEvent::Step { increment: 100 }, ProgressEvent::Step { increment: 100 }]
        );
    }

    #[test]
    fn test_stop_request_leaves_prefix() {
        let records: Vec<_> = (0..250).map(|_| record(1.4.into())).collect();
        let classification = classify(&columns()).unwrap();
        let progress = RecordingProgress { stop_after_steps: Some(1), ..Default::default() };
        let mut out = String::new();

        let result = serialize(&classification, &records, &SerializeOptions::default(), &mut out, Some(&progress));

        assert!(matches!(result, Err(ExportError::StoppedByCaller)));
        assert_eq!(out.lines().count(), 101);
    }

    #[test]
    fn test_record_width_mismatch() {
        let classification = classify(&columns()).unwrap();
        let records = vec![record(1.4.into()), vec![Value::from("setosa")]];
        let mut out = String::new();
        let result = serialize(&classification, &records, &SerializeOptions::default(), &mut out, None);
        assert!(matches!(result, Err(ExportError::RecordWidth { record: 1, expected: 5, found: 1 })));
        assert_eq!(out.lines().count(), 2);
    }

    #[test]
    fn test_sink_failure_propagates() {
        let classification = classify(&columns()).unwrap();
        let result = serialize(
            &classification,
            &[record(1.4.into())],
            &SerializeOptions::default(),
            &mut FailingSink,
            None,
        );
        assert!(matches!(result, Err(ExportError::SinkWrite(_))));
    }

    #[test]
    fn test_invalid_options_rejected_before_writing() {
        let classification = classify(&columns()).unwrap();
        let options = SerializeOptions::default().with_separator("");
        let mut out = String::new();
        let result = serialize(&classification, &[record(1.4.into())], &options, &mut out, None);
        assert!(matches!(result, Err(ExportError::InvalidOptions(_))));
        assert!(out.is_empty());
    }
}
