use classilist_abstraction::DatasetError;
use thiserror::Error;

pub type ExportResult<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no prediction(<class>) column found")]
    NoPredictionColumn,

    #[error("class column '{class_column}' not found")]
    MissingClassTruth { class_column: String },

    #[error("no feature columns found")]
    MissingFeatures,

    #[error("no confidence(<value>) columns found")]
    MissingProbabilities,

    #[error("failed to write output: {0}")]
    SinkWrite(#[from] std::io::Error),

    #[error("export stopped by caller")]
    StoppedByCaller,

    #[error("record {record} has {found} values, expected {expected}")]
    RecordWidth { record: u64, expected: usize, found: usize },

    #[error("invalid export options: {0}")]
    InvalidOptions(String),

    #[error("unknown output encoding: {0}")]
    UnknownEncoding(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

impl ExportError {
    /// True for failures raised while assigning column roles, before any output.
    pub fn is_classification(&self) -> bool {
        matches!(
            self,
            Self::NoPredictionColumn | Self::MissingClassTruth { .. } | Self::MissingFeatures | Self::MissingProbabilities
        )
    }
}
