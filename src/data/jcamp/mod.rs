//! JCAMP-DX spectra.
//!
//! `decode` turns the labelled-record text into arrays plus a
//! [`HeaderMap`](super::header::HeaderMap); this module maps the known records onto spectrum
//! metadata and asks the classifier for a technique.

mod asdf;
pub mod decode;

pub use decode::{decode, JcampBlock};

use super::classify::classify_traced;
use super::error::ParseError;
use super::model::{derived_metadata, MetadataValue, NormalizedSpectrum, ParseTrace, SourceFormat};

/// Metadata key → header labels that may carry it, in preference order.
const HEADER_FIELDS: &[(&str, &[&str])] = &[
    ("title", &["title"]),
    ("origin", &["origin"]),
    ("owner", &["owner"]),
    ("xunits", &["xunits"]),
    ("yunits", &["yunits"]),
    ("jcamp_version", &["jcampdx"]),
    ("datatype", &["datatype"]),
    ("spectrometer", &["spectrometer", "spectrometerdatasystem"]),
    ("instrument", &["instrument", "instrumentparameters"]),
    ("resolution", &["resolution"]),
    ("detector", &["detector"]),
    ("source", &["source", "sourcereference"]),
    ("sample_description", &["sampledescription"]),
    ("cas_registry_no", &["casregistryno"]),
    ("molform", &["molform"]),
    ("date", &["date", "longdate"]),
    ("time", &["time"]),
];

/// Parse JCAMP-DX text. `filename` feeds the classifier's last-resort rule.
///
/// Missing optional records become empty strings; only an absent data
/// table fails, with [`ParseError::NoSpectralData`].
pub fn parse_jcamp(text: &str, filename: &str) -> Result<NormalizedSpectrum, ParseError> {
    let block = decode(text)?;
    if block.x.is_empty() || block.y.is_empty() {
        return Err(ParseError::NoSpectralData);
    }

    let mut metadata = derived_metadata(SourceFormat::Jcamp, &block.x);
    for (key, labels) in HEADER_FIELDS {
        let value = block.header.get_any(labels).unwrap_or_default();
        metadata.insert((*key).to_string(), MetadataValue::from(value));
    }

    let (technique, stage) = classify_traced(&block.header, filename);

    let mut trace = ParseTrace::new(SourceFormat::Jcamp);
    trace.header_fields = block.header.labels().map(str::to_string).collect();
    trace.classified_by = stage;
    trace.y_checks_dropped = block.y_checks_dropped;

    NormalizedSpectrum::new(block.x, block.y, metadata, technique, trace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ClassifyStage, Technique};

    const UV: &str = "\
##TITLE=Methyl orange in water
##JCAMP-DX=4.24
##DATA TYPE=UV/VIS SPECTRUM
##ORIGIN=teaching lab
##OWNER=public domain
##SPECTROMETER/DATA SYSTEM=Cary 60
##CAS REGISTRY NO=547-58-0
##XUNITS=NANOMETERS
##YUNITS=ABSORBANCE
##XYDATA=(X++(Y..Y))
400 0.10
450 0.55
500 0.80
##END=
";

    #[test]
    fn populates_known_fields() {
        let sp = parse_jcamp(UV, "mo.jdx").unwrap();
        assert_eq!(sp.technique(), Technique::UvVis);
        assert_eq!(sp.meta_str("title"), Some("Methyl orange in water"));
        assert_eq!(sp.meta_str("jcamp_version"), Some("4.24"));
        assert_eq!(sp.meta_str("spectrometer"), Some("Cary 60"));
        assert_eq!(sp.meta_str("cas_registry_no"), Some("547-58-0"));
        assert_eq!(sp.meta_str("original_format"), Some("JCAMP-DX"));
        assert_eq!(sp.metadata()["wavelength_range"], MetadataValue::Range(400.0, 500.0));
        assert_eq!(sp.trace().classified_by, Some(ClassifyStage::DataType));
        assert!(sp.trace().header_fields.iter().any(|f| f == "casregistryno"));
    }

    #[test]
    fn missing_optional_fields_default_to_empty() {
        let sp = parse_jcamp("##TITLE=bare\n##XYDATA=(X++(Y..Y))\n1 2\n##END=", "bare.dx").unwrap();
        assert_eq!(sp.metadata()["owner"], MetadataValue::String(String::new()));
        assert_eq!(sp.metadata()["detector"], MetadataValue::String(String::new()));
        assert_eq!(sp.technique(), Technique::Unknown);
        assert_eq!(sp.trace().classified_by, None);
    }

    #[test]
    fn filename_classifies_when_header_is_silent() {
        let text = "##TITLE=phenol\n##XYDATA=(X++(Y..Y))\n1 2\n##END=";
        let sp = parse_jcamp(text, "108-95-2-IR.jdx").unwrap();
        assert_eq!(sp.technique(), Technique::Ir);
        assert_eq!(sp.meta_str("technique"), Some("IR"));
    }

    #[test]
    fn header_only_is_no_spectral_data() {
        let text = "##TITLE=nothing\n##DATA TYPE=INFRARED SPECTRUM\n##END=";
        let err = parse_jcamp(text, "x.jdx").unwrap_err();
        assert_eq!(err, ParseError::NoSpectralData);
    }
}
