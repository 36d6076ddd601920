/// Data layer: spectrum model, format parsers, classification and export.
///
/// Architecture:
/// ```text
///  bytes + filename
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  decode text, route by extension / sniffing, hash bytes
///   └──────────┘
///      │      │
///      ▼      ▼
///  ┌─────────┐ ┌────────┐
///  │delimited│ │ jcamp  │──► classify (header + filename → Technique)
///  └─────────┘ └────────┘
///        │
///        ▼
///   ┌────────────────────┐
///   │ NormalizedSpectrum │  x/y arrays, metadata, technique, content hash
///   └────────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  csv / json / jcamp text
///   └──────────┘
/// ```

pub mod classify;
pub mod delimited;
pub mod error;
pub mod export;
pub mod hash;
pub mod header;
pub mod jcamp;
pub mod loader;
pub mod model;
