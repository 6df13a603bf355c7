// Error taxonomy for the merge pipeline
// Fatal kinds map 1:1 to what the upload layer shows the user

use thiserror::Error;

/// Fatal pipeline errors. Zero matches is NOT an error: the pipeline
/// returns a header-only CSV and reports `match_count == 0` instead.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Declared product-file format is neither PDF nor CSV.
    #[error("unsupported product file format: {0}")]
    UnsupportedFormat(String),

    /// File bytes cannot be parsed at all under the declared format.
    /// Individually unreadable lines do NOT raise this.
    #[error("could not parse {format} input: {reason}")]
    CorruptInput {
        format: &'static str,
        reason: String,
    },

    /// Customer CSV lacks a required column.
    #[error("customer CSV is missing required column: {0}")]
    MissingColumn(String),

    /// An extraction rule failed to compile.
    #[error("extraction rule '{id}' is invalid: {reason}")]
    InvalidRule { id: String, reason: String },

    /// Output serialization failed (should not happen for in-memory buffers).
    #[error("failed to write output CSV: {0}")]
    OutputCsv(String),
}

impl MergeError {
    /// Short stable code for API responses and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MergeError::UnsupportedFormat(_) => "unsupported_format",
            MergeError::CorruptInput { .. } => "corrupt_input",
            MergeError::MissingColumn(_) => "missing_column",
            MergeError::InvalidRule { .. } => "invalid_rule",
            MergeError::OutputCsv(_) => "output_csv",
        }
    }
}

impl From<csv::Error> for MergeError {
    fn from(e: csv::Error) -> Self {
        MergeError::OutputCsv(e.to_string())
    }
}
