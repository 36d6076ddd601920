//! Spectral file ingestion.
//!
//! Turns uploaded CSV and JCAMP-DX files into a [`NormalizedSpectrum`]
//! tagged with a [`Technique`] and a content hash, and re-encodes stored
//! spectra as CSV, JSON or JCAMP-DX. Everything here is synchronous,
//! in-memory and free of shared state.

pub mod config;
pub mod data;

pub use data::classify::{classify, classify_traced};
pub use data::delimited::parse_csv;
pub use data::error::{ExportError, ParseError};
pub use data::export::{export, export_as, ExportContext, ExportFormat, ExportPayload};
pub use data::hash::content_hash;
pub use data::header::HeaderMap;
pub use data::jcamp::parse_jcamp;
pub use data::loader::{detect_and_parse, detect_format, load_file};
pub use data::model::{
    ClassifyStage, Metadata, MetadataValue, NormalizedSpectrum, ParseTrace, Routing, SourceFormat,
    Technique,
};
