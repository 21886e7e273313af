//! Error types for GINI decoding.

use thiserror::Error;

/// Errors that can occur while decoding a GINI product.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Not a GINI product: {0}")]
    Format(String),

    #[error("Truncated input while reading {stage}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        stage: &'static str,
        needed: u64,
        available: u64,
    },

    #[error("Unsupported product: {0}")]
    UnsupportedProduct(String),

    /// Raised for a single bad calibration record. The header decoder
    /// recovers by skipping the record.
    #[error("Malformed calibration record {record}: {reason}")]
    CalibrationParse { record: usize, reason: String },

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Decode cancelled")]
    Cancelled,

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for GINI decoding.
pub type Result<T> = std::result::Result<T, DecodeError>;
