use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::error::ParseError;

// ---------------------------------------------------------------------------
// MetadataValue – a single metadata entry
// ---------------------------------------------------------------------------

/// A dynamically-typed metadata value.
///
/// Serialises untagged, so a metadata map renders as plain JSON
/// (`"title": "..."`, `"data_points": 3`, `"wavelength_range": [400.0, 800.0]`).
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Closed `[min, max]` interval over the abscissa.
    Range(f64, f64),
    Null,
}

impl Serialize for MetadataValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetadataValue::String(s) => serializer.serialize_str(s),
            MetadataValue::Integer(i) => serializer.serialize_i64(*i),
            MetadataValue::Float(v) => serializer.serialize_f64(*v),
            MetadataValue::Bool(b) => serializer.serialize_bool(*b),
            MetadataValue::Range(lo, hi) => [*lo, *hi].serialize(serializer),
            MetadataValue::Null => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Range(lo, hi) => write!(f, "[{lo}, {hi}]"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

impl MetadataValue {
    /// Borrow the value as text, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetadataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<usize> for MetadataValue {
    fn from(n: usize) -> Self {
        MetadataValue::Integer(n as i64)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

/// Metadata keyed by field name. Ordered so exports are stable.
pub type Metadata = BTreeMap<String, MetadataValue>;

// ---------------------------------------------------------------------------
// Technique
// ---------------------------------------------------------------------------

/// Spectroscopic technique a spectrum was acquired with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Default)]
pub enum Technique {
    #[serde(rename = "IR")]
    Ir,
    #[serde(rename = "Raman")]
    Raman,
    #[serde(rename = "UV-Vis")]
    UvVis,
    #[serde(rename = "Near-IR")]
    NearIr,
    #[serde(rename = "LIBS")]
    Libs,
    #[serde(rename = "XRF")]
    Xrf,
    #[serde(rename = "NMR")]
    Nmr,
    #[serde(rename = "MS")]
    Ms,
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Technique {
    pub const ALL: [Technique; 9] = [
        Technique::Ir,
        Technique::Raman,
        Technique::UvVis,
        Technique::NearIr,
        Technique::Libs,
        Technique::Xrf,
        Technique::Nmr,
        Technique::Ms,
        Technique::Unknown,
    ];

    /// Canonical label, as stored by the persistence layer.
    pub fn label(self) -> &'static str {
        match self {
            Technique::Ir => "IR",
            Technique::Raman => "Raman",
            Technique::UvVis => "UV-Vis",
            Technique::NearIr => "Near-IR",
            Technique::Libs => "LIBS",
            Technique::Xrf => "XRF",
            Technique::Nmr => "NMR",
            Technique::Ms => "MS",
            Technique::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Technique {
    type Err = std::convert::Infallible;

    /// Case-insensitive match on the canonical labels; anything else is `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(Technique::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s))
            .unwrap_or(Technique::Unknown))
    }
}

// ---------------------------------------------------------------------------
// ParseTrace – diagnostics returned alongside a parse
// ---------------------------------------------------------------------------

/// Which file format a spectrum was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceFormat {
    #[serde(rename = "CSV")]
    Csv,
    #[serde(rename = "JCAMP-DX")]
    Jcamp,
}

impl SourceFormat {
    pub fn label(self) -> &'static str {
        match self {
            SourceFormat::Csv => "CSV",
            SourceFormat::Jcamp => "JCAMP-DX",
        }
    }
}

/// How the dispatcher picked a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Routing {
    Extension,
    Sniffed,
    /// Parser called directly, without the dispatcher.
    Direct,
}

/// Stage of the classification chain that produced the technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifyStage {
    DataType,
    Title,
    Units,
    Origin,
    Filename,
}

impl fmt::Display for ClassifyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClassifyStage::DataType => "data type",
            ClassifyStage::Title => "title",
            ClassifyStage::Units => "units",
            ClassifyStage::Origin => "origin",
            ClassifyStage::Filename => "filename",
        })
    }
}

/// Field-level diagnostics for one parse. Nothing in the core prints;
/// callers that want to report what was found read it from here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseTrace {
    pub format: SourceFormat,
    pub routing: Routing,
    /// Canonical header labels present in the source (JCAMP only).
    pub header_fields: Vec<String>,
    /// `None` when no stage matched and the technique fell back to `Unknown`.
    pub classified_by: Option<ClassifyStage>,
    /// Field separator used (CSV only).
    pub delimiter: Option<char>,
    /// DIF Y-check ordinates dropped while decoding compressed JCAMP data.
    pub y_checks_dropped: usize,
}

impl ParseTrace {
    pub fn new(format: SourceFormat) -> Self {
        Self {
            format,
            routing: Routing::Direct,
            header_fields: Vec::new(),
            classified_by: None,
            delimiter: None,
            y_checks_dropped: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// NormalizedSpectrum – the parse result
// ---------------------------------------------------------------------------

/// A parsed spectrum, independent of the file format it came from.
///
/// Built once per parse and never mutated; the `with_*` methods consume
/// the value and return an updated one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSpectrum {
    x_values: Vec<f64>,
    y_values: Vec<f64>,
    metadata: Metadata,
    technique: Technique,
    content_hash: Option<String>,
    #[serde(skip)]
    trace: ParseTrace,
}

impl NormalizedSpectrum {
    /// Validate the arrays and assemble a spectrum.
    ///
    /// Arrays must be non-empty, equally long and finite. The technique is
    /// recorded both on the value and under `metadata["technique"]`.
    pub fn new(
        x_values: Vec<f64>,
        y_values: Vec<f64>,
        mut metadata: Metadata,
        technique: Technique,
        trace: ParseTrace,
    ) -> Result<Self, ParseError> {
        if x_values.len() != y_values.len() {
            return Err(ParseError::LengthMismatch {
                x_len: x_values.len(),
                y_len: y_values.len(),
            });
        }
        if x_values.is_empty() {
            return Err(ParseError::NoDataPoints);
        }
        if let Some(index) = x_values
            .iter()
            .zip(&y_values)
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(ParseError::NonFiniteValue { index });
        }

        metadata.insert("technique".into(), technique.label().into());
        Ok(Self {
            x_values,
            y_values,
            metadata,
            technique,
            content_hash: None,
            trace,
        })
    }

    /// Stamp the content hash, also mirrored into `metadata["content_hash"]`.
    pub fn with_content_hash(mut self, hash: String) -> Self {
        self.metadata
            .insert("content_hash".into(), MetadataValue::String(hash.clone()));
        self.content_hash = Some(hash);
        self
    }

    pub fn with_routing(mut self, routing: Routing) -> Self {
        self.trace.routing = routing;
        self
    }

    pub fn x_values(&self) -> &[f64] {
        &self.x_values
    }

    pub fn y_values(&self) -> &[f64] {
        &self.y_values
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn technique(&self) -> Technique {
        self.technique
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    pub fn trace(&self) -> &ParseTrace {
        &self.trace
    }

    /// Number of (x, y) points; always at least one.
    pub fn len(&self) -> usize {
        self.x_values.len()
    }

    /// Always `false`: construction rejects empty arrays.
    pub fn is_empty(&self) -> bool {
        self.x_values.is_empty()
    }

    /// String-valued metadata field, empty or absent fields yield `None`.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(MetadataValue::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// `[min, max]` over the abscissa.
    pub fn x_range(&self) -> (f64, f64) {
        value_range(&self.x_values)
    }
}

/// Min and max of a non-empty slice of finite values.
pub(crate) fn value_range(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Derived fields every parser records.
pub(crate) fn derived_metadata(format: SourceFormat, x: &[f64]) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("original_format".into(), format.label().into());
    metadata.insert("data_points".into(), x.len().into());
    if !x.is_empty() {
        let (lo, hi) = value_range(x);
        metadata.insert("wavelength_range".into(), MetadataValue::Range(lo, hi));
    }
    metadata
}
