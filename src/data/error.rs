use thiserror::Error;

/// Why a file could not be turned into a [`NormalizedSpectrum`](super::model::NormalizedSpectrum).
///
/// Every variant is fatal for the parse that raised it; no partial
/// spectrum is ever returned alongside an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("content is neither UTF-8 nor Latin-1 text")]
    UndecodableContent,
    #[error("file contains no non-empty lines")]
    EmptyInput,
    #[error("no valid data points found")]
    NoDataPoints,
    #[error("no spectral data found in JCAMP file")]
    NoSpectralData,
    #[error("line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
    #[error("JCAMP line {line}: {reason}")]
    MalformedJcamp { line: usize, reason: String },
    #[error("x has {x_len} values but y has {y_len}")]
    LengthMismatch { x_len: usize, y_len: usize },
    #[error("non-finite value at point {index}")]
    NonFiniteValue { index: usize },
}

/// Why a spectrum could not be re-encoded.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("unsupported export format: {0} (expected csv, json or jcamp)")]
    UnsupportedFormat(String),
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
