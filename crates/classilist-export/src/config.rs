//! Export configuration.
//!
//! [`SerializeOptions`] drives the row serializer; [`ExportSettings`] adds the
//! file-level concerns (location, append mode, encoding) and can be loaded
//! from a TOML file.

use crate::error::{ExportError, ExportResult};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// US short date/time, e.g. `9/13/20 12:26 PM`.
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%y %-I:%M %p";

/// Formatting options for the row serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializeOptions {
    /// Field delimiter placed between values.
    #[serde(default = "default_column_separator")]
    pub column_separator: String,

    /// Wrap nominal values in double quotes (embedded `"` become `'`).
    #[serde(default = "default_true")]
    pub quote_nominal_values: bool,

    /// Write the header row.
    #[serde(default = "default_true")]
    pub write_attribute_names: bool,

    /// Render date-time values with `date_format` instead of raw milliseconds.
    #[serde(default = "default_true")]
    pub format_date_attributes: bool,

    /// Symbol written for infinite numbers; `-` is prepended for negative infinity.
    #[serde(default)]
    pub infinity_symbol: Option<String>,

    /// strftime pattern for date-time values, rendered in UTC.
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_column_separator() -> String {
    ",".to_string()
}

fn default_true() -> bool {
    true
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            column_separator: default_column_separator(),
            quote_nominal_values: true,
            write_attribute_names: true,
            format_date_attributes: true,
            infinity_symbol: None,
            date_format: default_date_format(),
        }
    }
}

impl SerializeOptions {
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.column_separator = separator.into();
        self
    }

    #[must_use]
    pub fn with_infinity_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.infinity_symbol = Some(symbol.into());
        self
    }

    #[must_use]
    pub fn with_quote_nominal_values(mut self, quote: bool) -> Self {
        self.quote_nominal_values = quote;
        self
    }

    #[must_use]
    pub fn with_format_date_attributes(mut self, format: bool) -> Self {
        self.format_date_attributes = format;
        self
    }

    #[must_use]
    pub fn with_write_attribute_names(mut self, write: bool) -> Self {
        self.write_attribute_names = write;
        self
    }

    /// Checks that the options can be applied.
    ///
    /// # Errors
    /// Returns `InvalidOptions` for an empty separator or a malformed date pattern.
    pub fn validate(&self) -> ExportResult<()> {
        if self.column_separator.is_empty() {
            return Err(ExportError::InvalidOptions("column separator must not be empty".to_string()));
        }
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(ExportError::InvalidOptions(format!("invalid date format: {}", self.date_format)));
        }
        Ok(())
    }
}

/// Settings for exporting a dataset to a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Destination file.
    pub location: PathBuf,

    /// Append to an existing file instead of replacing it.
    #[serde(default)]
    pub append_to_file: bool,

    /// Output encoding label (e.g. "UTF-8", "windows-1252").
    #[serde(default = "default_encoding")]
    pub encoding: String,

    #[serde(flatten)]
    pub format: SerializeOptions,
}

impl ExportSettings {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            append_to_file: false,
            encoding: default_encoding(),
            format: SerializeOptions::default(),
        }
    }

    /// Load settings from a TOML file.
    pub fn load_from_file(path: &Path) -> ExportResult<Self> {
        if !path.exists() {
            return Err(ExportError::Config(format!("configuration file not found: {}", path.display())));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ExportError::Config(format!("{}: {}", path.display(), e)))?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ExportError::Config(msg) => ExportError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> ExportResult<Self> {
        let settings: Self = toml::from_str(content).map_err(|e| ExportError::Config(e.to_string()))?;
        settings.format.validate()?;
        Ok(settings)
    }

    pub fn serialize_options(&self) -> &SerializeOptions {
        &self.format
    }
}
