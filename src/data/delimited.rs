use csv::{ReaderBuilder, StringRecord, Trim};

use super::error::ParseError;
use super::model::{derived_metadata, NormalizedSpectrum, ParseTrace, SourceFormat, Technique};

// ---------------------------------------------------------------------------
// Two-column CSV / TSV
// ---------------------------------------------------------------------------

/// Parse `wavelength,intensity` rows, with an optional header line.
///
/// The first non-empty line is a header when its first two fields do not
/// both parse as floats; `inf`/`nan` count as floats there and then fail
/// as a data row. Any later row that fails to parse aborts the
/// whole parse with [`ParseError::MalformedRow`] carrying the 1-based line
/// number in `text`.
///
/// CSV carries no instrument metadata, so the technique is always
/// [`Technique::Unknown`].
pub fn parse_csv(text: &str) -> Result<NormalizedSpectrum, ParseError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let first_line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or(ParseError::EmptyInput)?;
    let delimiter = sniff_delimiter(first_line);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter as u8)
        .from_reader(text.as_bytes());

    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut has_header: Option<bool> = None;

    for result in reader.records() {
        let record = result.map_err(|e| ParseError::MalformedRow {
            line: e.position().map_or(0, |p| p.line() as usize),
            reason: e.to_string(),
        })?;
        // whitespace-only line
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |p| p.line() as usize);

        if has_header.is_none() {
            let is_header = !looks_numeric(&record);
            has_header = Some(is_header);
            if is_header {
                continue;
            }
        }

        let (xv, yv) =
            parse_pair(&record).map_err(|reason| ParseError::MalformedRow { line, reason })?;
        x.push(xv);
        y.push(yv);
    }

    if x.is_empty() {
        return Err(ParseError::NoDataPoints);
    }

    let mut metadata = derived_metadata(SourceFormat::Csv, &x);
    metadata.insert("has_header".into(), has_header.unwrap_or(false).into());

    let mut trace = ParseTrace::new(SourceFormat::Csv);
    trace.delimiter = Some(delimiter);

    NormalizedSpectrum::new(x, y, metadata, Technique::Unknown, trace)
}

/// Comma unless the first line has none but does carry a tab or semicolon.
fn sniff_delimiter(first_line: &str) -> char {
    if first_line.contains(',') {
        ','
    } else if first_line.contains('\t') {
        '\t'
    } else if first_line.contains(';') {
        ';'
    } else {
        ','
    }
}

/// Header test: both leading fields parse as floats, finite or not.
fn looks_numeric(record: &StringRecord) -> bool {
    record.len() >= 2 && record[0].parse::<f64>().is_ok() && record[1].parse::<f64>().is_ok()
}

fn parse_pair(record: &StringRecord) -> Result<(f64, f64), String> {
    if record.len() < 2 {
        return Err("expected wavelength,intensity".to_string());
    }
    Ok((parse_finite(&record[0])?, parse_finite(&record[1])?))
}

fn parse_finite(field: &str) -> Result<f64, String> {
    let v: f64 = field
        .parse()
        .map_err(|_| format!("'{field}' is not a number"))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(format!("'{field}' is not a finite number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::MetadataValue;

    #[test]
    fn header_detected() {
        let sp = parse_csv("wavelength,intensity\n400,0.1\n410,0.2").unwrap();
        assert_eq!(sp.len(), 2);
        assert_eq!(sp.metadata()["has_header"], MetadataValue::Bool(true));
        assert_eq!(sp.x_values(), &[400.0, 410.0]);
        assert_eq!(sp.y_values(), &[0.1, 0.2]);
    }

    #[test]
    fn headerless() {
        let sp = parse_csv("400,0.1\n410,0.2").unwrap();
        assert_eq!(sp.len(), 2);
        assert_eq!(sp.metadata()["has_header"], MetadataValue::Bool(false));
    }

    #[test]
    fn derived_fields() {
        let sp = parse_csv("500,1\n400,2\n450,3\n").unwrap();
        let m = sp.metadata();
        assert_eq!(m["original_format"], MetadataValue::String("CSV".into()));
        assert_eq!(m["data_points"], MetadataValue::Integer(3));
        assert_eq!(m["wavelength_range"], MetadataValue::Range(400.0, 500.0));
        assert_eq!(sp.technique(), Technique::Unknown);
        assert_eq!(sp.meta_str("technique"), Some("Unknown"));
    }

    #[test]
    fn malformed_row_aborts() {
        let err = parse_csv("400,0.1\nabc,0.2\n420,0.3").unwrap_err();
        match err {
            ParseError::MalformedRow { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("abc"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn short_row_rejected() {
        let err = parse_csv("x,y\n400,0.1\n410\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedRow { line: 3, .. }));
    }

    #[test]
    fn nan_rejected() {
        let err = parse_csv("400,0.1\n410,nan\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn non_finite_first_row_is_data_not_header() {
        let err = parse_csv("400,inf\n410,0.2\n420,0.3\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedRow { line: 1, .. }));
        let err = parse_csv("NaN,0.1\n410,0.2\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedRow { line: 1, .. }));
    }

    #[test]
    fn empty_and_header_only() {
        assert_eq!(parse_csv("").unwrap_err(), ParseError::EmptyInput);
        assert_eq!(parse_csv(" \n\n  \n").unwrap_err(), ParseError::EmptyInput);
        assert_eq!(
            parse_csv("wavelength,intensity\n").unwrap_err(),
            ParseError::NoDataPoints
        );
    }

    #[test]
    fn blank_lines_and_extra_columns() {
        let sp = parse_csv("\nwl,int,flag\n\n400, 0.1 ,a\n   \n410,0.2,b\n").unwrap();
        assert_eq!(sp.y_values(), &[0.1, 0.2]);
    }

    #[test]
    fn tab_and_semicolon_delimited() {
        let sp = parse_csv("400\t0.1\n410\t0.2\n").unwrap();
        assert_eq!(sp.len(), 2);
        assert_eq!(sp.trace().delimiter, Some('\t'));

        let sp = parse_csv("wl;int\n400;0.1\n").unwrap();
        assert_eq!(sp.x_values(), &[400.0]);
    }

    #[test]
    fn bom_stripped() {
        let sp = parse_csv("\u{feff}400,0.1\n410,0.2\n").unwrap();
        assert_eq!(sp.metadata()["has_header"], MetadataValue::Bool(false));
    }

    #[test]
    fn crlf_and_exponents() {
        let sp = parse_csv("x,y\r\n4.0E2,1e-3\r\n410,-2.5\r\n").unwrap();
        assert_eq!(sp.x_values(), &[400.0, 410.0]);
        assert_eq!(sp.y_values(), &[0.001, -2.5]);
    }
}
