use thiserror::Error;

/// Convenience result type for file loading.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Convenience result type for ingester construction, lifecycle and selection.
pub type IngesterResult<T> = Result<T, IngesterError>;

/// Error type returned while loading a single data file into a [`crate::types::DataSet`].
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Parquet decoding error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// The input does not conform to the provided schema (missing columns, wrong shape).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },

    /// No reader exists for the file (unknown or missing extension).
    #[error("unsupported format: {message}")]
    UnsupportedFormat { message: String },
}

/// Raised by an ingester factory when its kind does not handle the given flags.
///
/// This is not a fatal error: the orchestrator should try the next registered kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ingester kind '{kind}' is not applicable: {reason}")]
pub struct NotApplicableError {
    /// Registered name of the ingester kind that declined.
    pub kind: String,
    /// Human-readable reason, usually naming the missing flag.
    pub reason: String,
}

impl NotApplicableError {
    pub fn new(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

/// Error type for the ingester interface.
#[derive(Debug, Error)]
pub enum IngesterError {
    /// This ingester kind cannot be constructed from the given flags.
    #[error(transparent)]
    NotApplicable(#[from] NotApplicableError),

    /// No registered ingester kind accepted the flags.
    #[error("no ingester applicable; tried: {}", format_tried(.tried))]
    NoApplicableIngester { tried: Vec<NotApplicableError> },

    /// A flag is present but malformed, or a required companion flag is missing.
    #[error("invalid flag '{flag}': {message}")]
    InvalidFlag { flag: String, message: String },

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// An accessor was dereferenced before `start` was called.
    #[error("ingester '{kind}' has not been started")]
    NotStarted { kind: &'static str },

    /// `start` was called more than once.
    #[error("ingester '{kind}' was already started")]
    AlreadyStarted { kind: &'static str },

    /// Loading data failed during `start` or a reload.
    #[error("ingestion failed for {location}: {source}")]
    Load {
        location: String,
        #[source]
        source: IngestionError,
    },

    /// Underlying I/O error outside of a single file load (directory scans, worker spawn).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngesterError {
    /// Returns `true` for the non-fatal "try the next kind" signal.
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable(_))
    }

    pub(crate) fn invalid_flag(flag: &str, message: impl Into<String>) -> Self {
        Self::InvalidFlag {
            flag: flag.to_string(),
            message: message.into(),
        }
    }
}

fn format_tried(tried: &[NotApplicableError]) -> String {
    if tried.is_empty() {
        return "<no kinds registered>".to_string();
    }
    tried
        .iter()
        .map(|e| format!("{} ({})", e.kind, e.reason))
        .collect::<Vec<_>>()
        .join(", ")
}
