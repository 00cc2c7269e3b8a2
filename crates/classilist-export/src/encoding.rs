//! Encoded character output.

use crate::error::{ExportError, ExportResult};
use classilist_abstraction::TextSink;
use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE, UTF_8};
use std::io::{self, Write};
use tracing::warn;

/// Looks up an encoding by WHATWG label, e.g. "UTF-8" or "latin1".
///
/// The decode-only "replacement" encoding is rejected.
pub fn resolve_encoding(label: &str) -> ExportResult<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .filter(|encoding| *encoding != REPLACEMENT)
        .ok_or_else(|| ExportError::UnknownEncoding(label.to_string()))
}

/// A [`TextSink`] that encodes text into a byte stream.
///
/// UTF-16 output is written without a byte order mark. Characters the target
/// encoding cannot represent are written as numeric character references
/// (`&#NNNN;`).
pub struct EncodedWriter<W: Write> {
    inner: W,
    encoding: &'static Encoding,
    reported_unmappable: bool,
}

impl<W: Write> EncodedWriter<W> {
    pub fn new(inner: W, encoding: &'static Encoding) -> Self {
        Self { inner, encoding, reported_unmappable: false }
    }

    pub fn utf8(inner: W) -> Self {
        Self::new(inner, UTF_8)
    }

    pub fn for_label(inner: W, label: &str) -> ExportResult<Self> {
        Ok(Self::new(inner, resolve_encoding(label)?))
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> TextSink for EncodedWriter<W> {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        if self.encoding == UTF_8 {
            return self.inner.write_all(text.as_bytes());
        }
        // encoding_rs only encodes UTF-16 labels as UTF-8.
        if self.encoding == UTF_16LE || self.encoding == UTF_16BE {
            let little_endian = self.encoding == UTF_16LE;
            let bytes: Vec<u8> = text
                .encode_utf16()
                .flat_map(|unit| if little_endian { unit.to_le_bytes() } else { unit.to_be_bytes() })
                .collect();
            return self.inner.write_all(&bytes);
        }
        let (bytes, _, unmappable) = self.encoding.encode(text);
        if unmappable && !self.reported_unmappable {
            self.reported_unmappable = true;
            warn!(encoding = self.encoding.name(), "output contains characters the encoding cannot represent");
        }
        self.inner.write_all(&bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
