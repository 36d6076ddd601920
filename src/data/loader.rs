use std::borrow::Cow;
use std::path::Path;

use anyhow::{Context, Result};

use super::delimited::parse_csv;
use super::error::ParseError;
use super::hash::content_hash;
use super::jcamp::parse_jcamp;
use super::model::{NormalizedSpectrum, Routing, SourceFormat};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse an uploaded file. Dispatch by extension, else by content.
///
/// Routing:
/// * `.csv`                   – delimited parser
/// * `.dx` / `.jdx` / `.jcamp` – JCAMP-DX parser
/// * anything else (`.txt`, no extension) – JCAMP-DX if the text opens
///   with `##`, delimited otherwise
///
/// The returned spectrum carries the SHA-256 of `bytes` as its content hash.
pub fn detect_and_parse(bytes: &[u8], filename: &str) -> Result<NormalizedSpectrum, ParseError> {
    let text = decode_text(bytes)?;
    let (format, routing) = detect_format(filename, &text);

    let spectrum = match format {
        SourceFormat::Csv => parse_csv(&text)?,
        SourceFormat::Jcamp => parse_jcamp(&text, filename)?,
    };
    Ok(spectrum
        .with_routing(routing)
        .with_content_hash(content_hash(bytes)))
}

/// Read and parse a file from disk.
pub fn load_file(path: &Path) -> Result<NormalizedSpectrum> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    detect_and_parse(&bytes, filename).with_context(|| format!("parsing {filename}"))
}

/// Pick a parser for `filename`, sniffing `text` when the extension is
/// not one we route on.
pub fn detect_format(filename: &str, text: &str) -> (SourceFormat, Routing) {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => (SourceFormat::Csv, Routing::Extension),
        "dx" | "jdx" | "jcamp" => (SourceFormat::Jcamp, Routing::Extension),
        _ if text.trim_start().starts_with("##") => (SourceFormat::Jcamp, Routing::Sniffed),
        _ => (SourceFormat::Csv, Routing::Sniffed),
    }
}

// ---------------------------------------------------------------------------
// Text decoding
// ---------------------------------------------------------------------------

/// UTF-8, else Latin-1. A UTF-8 byte-order mark is dropped.
///
/// Latin-1 maps every byte, so the only rejection is for NUL bytes,
/// which no text export of ours contains (UTF-16, binary vendor formats).
fn decode_text(bytes: &[u8]) -> Result<Cow<'_, str>, ParseError> {
    if bytes.contains(&0) {
        return Err(ParseError::UndecodableContent);
    }
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    };
    Ok(match text {
        Cow::Borrowed(s) => Cow::Borrowed(s.strip_prefix('\u{feff}').unwrap_or(s)),
        Cow::Owned(s) => Cow::Owned(s),
    })
}
