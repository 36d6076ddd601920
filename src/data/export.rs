use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use csv::{Terminator, WriterBuilder};
use serde::Serialize;

use super::error::ExportError;
use super::model::{Metadata, NormalizedSpectrum, Technique};

// ---------------------------------------------------------------------------
// Formats and envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Jcamp,
}

impl ExportFormat {
    /// Format name, also used as the suggested file extension.
    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Jcamp => "jcamp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Jcamp => "text/plain",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "jcamp" => Ok(ExportFormat::Jcamp),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// What the storage layer knows about a spectrum beyond its parse result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportContext {
    /// Original upload filename.
    pub filename: String,
    pub sample_id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ExportContext {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub fn with_sample(mut self, sample_id: i64) -> Self {
        self.sample_id = Some(sample_id);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    fn stem(&self) -> &str {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("spectrum")
    }
}

/// An encoded spectrum ready to be sent as a download.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPayload {
    pub body: String,
    pub content_type: &'static str,
    /// `<original-stem>.<format>`
    pub filename: String,
}

// ---------------------------------------------------------------------------
// Entry-points
// ---------------------------------------------------------------------------

/// Encode `spectrum` as `format` (`csv`, `json` or `jcamp`).
pub fn export(
    spectrum: &NormalizedSpectrum,
    format: &str,
    context: &ExportContext,
) -> Result<ExportPayload, ExportError> {
    export_as(spectrum, format.parse()?, context)
}

pub fn export_as(
    spectrum: &NormalizedSpectrum,
    format: ExportFormat,
    context: &ExportContext,
) -> Result<ExportPayload, ExportError> {
    let body = match format {
        ExportFormat::Csv => to_csv(spectrum)?,
        ExportFormat::Json => to_json(spectrum, context)?,
        ExportFormat::Jcamp => to_jcamp(spectrum, context),
    };
    Ok(ExportPayload {
        body,
        content_type: format.content_type(),
        filename: format!("{}.{}", context.stem(), format.name()),
    })
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn to_csv(spectrum: &NormalizedSpectrum) -> Result<String, ExportError> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(["wavelength", "intensity"])?;
    for (x, y) in spectrum.x_values().iter().zip(spectrum.y_values()) {
        writer.write_record([x.to_string(), y.to_string()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SpectrumDocument<'a> {
    filename: &'a str,
    technique: Technique,
    sample_id: Option<i64>,
    wavelengths: &'a [f64],
    intensities: &'a [f64],
    acquisition_parameters: &'a Metadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

fn to_json(spectrum: &NormalizedSpectrum, context: &ExportContext) -> Result<String, ExportError> {
    let document = SpectrumDocument {
        filename: &context.filename,
        technique: spectrum.technique(),
        sample_id: context.sample_id,
        wavelengths: spectrum.x_values(),
        intensities: spectrum.y_values(),
        acquisition_parameters: spectrum.metadata(),
        created_at: context.created_at,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

// ---------------------------------------------------------------------------
// JCAMP-DX
// ---------------------------------------------------------------------------

fn data_type_label(technique: Technique) -> &'static str {
    match technique {
        Technique::Ir => "INFRARED SPECTRUM",
        Technique::Raman => "RAMAN SPECTRUM",
        Technique::UvVis => "UV/VIS SPECTRUM",
        Technique::Libs => "EMISSION SPECTRUM",
        Technique::Xrf => "X-RAY FLUORESCENCE SPECTRUM",
        Technique::Nmr => "NMR SPECTRUM",
        Technique::Ms => "MASS SPECTRUM",
        Technique::NearIr | Technique::Unknown => "SPECTRUM",
    }
}

/// (XUNITS, YUNITS). Techniques with a conventional axis pin it; the rest
/// keep what the source declared.
fn axis_units(spectrum: &NormalizedSpectrum) -> (String, String) {
    let declared =
        |key: &str, fallback: &str| spectrum.meta_str(key).unwrap_or(fallback).to_string();
    match spectrum.technique() {
        Technique::Ir => ("1/CM".into(), declared("yunits", "TRANSMITTANCE")),
        Technique::Raman => ("1/CM".into(), "INTENSITY".into()),
        Technique::UvVis => ("NANOMETERS".into(), "ABSORBANCE".into()),
        _ => (
            declared("xunits", "ARBITRARY UNITS"),
            declared("yunits", "ARBITRARY UNITS"),
        ),
    }
}

fn push_record(out: &mut String, label: &str, value: impl Display) {
    let value = value.to_string();
    if value.is_empty() {
        out.push_str(&format!("##{label}=\n"));
    } else {
        out.push_str(&format!("##{label}= {value}\n"));
    }
}

/// Simplified JCAMP-DX 4.24 writer: AFFN, one `x y` pair per line.
fn to_jcamp(spectrum: &NormalizedSpectrum, context: &ExportContext) -> String {
    let x = spectrum.x_values();
    let y = spectrum.y_values();
    let mut out = String::with_capacity(256 + x.len() * 24);

    push_record(&mut out, "TITLE", spectrum.meta_str("title").unwrap_or(context.stem()));
    push_record(&mut out, "JCAMP-DX", "4.24");
    push_record(&mut out, "DATA TYPE", data_type_label(spectrum.technique()));
    push_record(&mut out, "ORIGIN", spectrum.meta_str("origin").unwrap_or_default());
    push_record(&mut out, "OWNER", spectrum.meta_str("owner").unwrap_or_default());

    let (x_units, y_units) = axis_units(spectrum);
    push_record(&mut out, "XUNITS", x_units);
    push_record(&mut out, "YUNITS", y_units);

    if let (Some(first), Some(last)) = (x.first(), x.last()) {
        push_record(&mut out, "FIRSTX", first);
        push_record(&mut out, "LASTX", last);
        push_record(&mut out, "NPOINTS", x.len());
    }

    push_record(&mut out, "XYDATA", "(X++(Y..Y))");
    for (xv, yv) in x.iter().zip(y) {
        out.push_str(&format!("{xv} {yv}\n"));
    }
    push_record(&mut out, "END", "");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Metadata, ParseTrace, SourceFormat};
    use chrono::TimeZone;

    fn spectrum(technique: Technique, metadata: Metadata) -> NormalizedSpectrum {
        NormalizedSpectrum::new(
            vec![400.0, 410.5, 420.0],
            vec![0.1, -0.2, 3.0],
            metadata,
            technique,
            ParseTrace::new(SourceFormat::Csv),
        )
        .unwrap()
    }

    #[test]
    fn csv_layout() {
        let sp = spectrum(Technique::Unknown, Metadata::new());
        let payload = export(&sp, "csv", &ExportContext::new("run1.dx")).unwrap();
        assert_eq!(payload.body, "wavelength,intensity\n400,0.1\n410.5,-0.2\n420,3\n");
        assert_eq!(payload.content_type, "text/csv");
        assert_eq!(payload.filename, "run1.csv");
    }

    #[test]
    fn json_document() {
        let context = ExportContext::new("run1.csv")
            .with_sample(7)
            .with_created_at(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        let payload =
            export(&spectrum(Technique::Raman, Metadata::new()), "JSON", &context).unwrap();
        assert_eq!(payload.content_type, "application/json");
        assert!(payload.body.contains('\n'), "pretty-printed");

        let doc: serde_json::Value = serde_json::from_str(&payload.body).unwrap();
        assert_eq!(doc["filename"], "run1.csv");
        assert_eq!(doc["technique"], "Raman");
        assert_eq!(doc["sample_id"], 7);
        assert_eq!(doc["wavelengths"][1], 410.5);
        assert_eq!(doc["intensities"][2], 3.0);
        assert_eq!(doc["acquisition_parameters"]["technique"], "Raman");
        assert_eq!(doc["created_at"], "2024-03-01T12:00:00Z");
    }

    #[test]
    fn json_omits_missing_timestamp() {
        let sp = spectrum(Technique::Ir, Metadata::new());
        let payload = export(&sp, "json", &ExportContext::new("a.csv")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&payload.body).unwrap();
        assert!(doc.get("created_at").is_none());
        assert!(doc["sample_id"].is_null());
    }

    #[test]
    fn jcamp_record_order() {
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), "phenol".into());
        metadata.insert("yunits".into(), "ABSORBANCE".into());
        let sp = spectrum(Technique::Ir, metadata);
        let payload = export(&sp, "jcamp", &ExportContext::new("phenol.jdx")).unwrap();
        let labels: Vec<&str> = payload
            .body
            .lines()
            .filter_map(|l| l.strip_prefix("##"))
            .map(|l| l.split('=').next().unwrap_or(""))
            .collect();
        assert_eq!(
            labels,
            [
                "TITLE", "JCAMP-DX", "DATA TYPE", "ORIGIN", "OWNER", "XUNITS", "YUNITS", "FIRSTX",
                "LASTX", "NPOINTS", "XYDATA", "END"
            ]
        );
        assert!(payload.body.contains("##TITLE= phenol\n"));
        assert!(payload.body.contains("##DATA TYPE= INFRARED SPECTRUM\n"));
        assert!(payload.body.contains("##XUNITS= 1/CM\n##YUNITS= ABSORBANCE\n"));
        assert!(payload.body.contains("##NPOINTS= 3\n"));
        assert!(payload.body.contains("410.5 -0.2\n"));
        assert!(payload.body.ends_with("##END=\n"));
        assert_eq!(payload.content_type, "text/plain");
        assert_eq!(payload.filename, "phenol.jcamp");
    }

    #[test]
    fn jcamp_units_per_technique() {
        let body = |t| {
            let sp = spectrum(t, Metadata::new());
            export_as(&sp, ExportFormat::Jcamp, &ExportContext::default()).unwrap().body
        };
        assert!(body(Technique::Ir).contains("##YUNITS= TRANSMITTANCE"));
        assert!(body(Technique::Raman).contains("##XUNITS= 1/CM\n##YUNITS= INTENSITY"));
        assert!(body(Technique::UvVis).contains("##XUNITS= NANOMETERS\n##YUNITS= ABSORBANCE"));
        assert!(body(Technique::Libs).contains("##DATA TYPE= EMISSION SPECTRUM"));
        assert!(body(Technique::Unknown).contains("##DATA TYPE= SPECTRUM\n"));
        assert!(body(Technique::Unknown).contains("##XUNITS= ARBITRARY UNITS"));
        assert!(body(Technique::Unknown).contains("##TITLE= spectrum\n"));
    }

    #[test]
    fn unsupported_format() {
        let sp = spectrum(Technique::Ir, Metadata::new());
        let err = export(&sp, "xml", &ExportContext::default()).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat(f) if f == "xml"));
    }
}
