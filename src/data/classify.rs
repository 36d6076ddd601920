use super::header::HeaderMap;
use super::model::{ClassifyStage, Technique};

// ---------------------------------------------------------------------------
// Technique classification
// ---------------------------------------------------------------------------
//
// An ordered list of independent rules; the first rule that returns a
// technique wins. Later rules only run when every earlier one is
// inconclusive. No rule looks at the abscissa range.

type Rule = fn(&Evidence<'_>) -> Option<Technique>;

const RULES: [(ClassifyStage, Rule); 5] = [
    (ClassifyStage::DataType, by_data_type),
    (ClassifyStage::Title, by_title),
    (ClassifyStage::Units, by_units),
    (ClassifyStage::Origin, by_origin),
    (ClassifyStage::Filename, by_filename),
];

type KeywordTable = &'static [(&'static [&'static str], Technique)];

const DATA_TYPE_KEYWORDS: KeywordTable = &[
    (&["INFRARED", "IR SPECTRUM", "FTIR"], Technique::Ir),
    (&["RAMAN"], Technique::Raman),
    (&["ULTRAVIOLET", "UV", "VISIBLE", "UV/VIS"], Technique::UvVis),
    (&["MASS", "MS"], Technique::Ms),
    (&["NMR"], Technique::Nmr),
];

const TITLE_KEYWORDS: KeywordTable = &[
    (&["IR SPECTRUM", "INFRARED", "FTIR", " IR "], Technique::Ir),
    (&["RAMAN"], Technique::Raman),
    (&["UV", "VISIBLE", "UV-VIS", "ABSORPTION"], Technique::UvVis),
    (&["LIBS"], Technique::Libs),
    (&["XRF", "X-RAY"], Technique::Xrf),
];

const ORIGIN_KEYWORDS: KeywordTable = &[
    (&["FTIR", "INFRARED"], Technique::Ir),
    (&["RAMAN"], Technique::Raman),
    (&["UV", "VISIBLE"], Technique::UvVis),
];

const FILENAME_KEYWORDS: KeywordTable = &[
    (&["-IR.", "_IR.", "IR-", "IR_", "INFRARED"], Technique::Ir),
    (&["-RAMAN.", "_RAMAN.", "RAMAN-", "RAMAN_"], Technique::Raman),
    (&["-UV.", "_UV.", "UV-", "UV_", "-VIS.", "_VIS."], Technique::UvVis),
];

const WAVENUMBER_UNITS: &[&str] = &["1/CM", "CM-1", "CM^-1", "WAVENUMBER"];
const NANOMETER_UNITS: &[&str] = &["NANOMETER", "NM"];
const ABSORPTIVE_UNITS: &[&str] = &["TRANSMITTANCE", "ABSORBANCE"];
const EMISSIVE_UNITS: &[&str] = &["INTENSITY", "COUNTS"];

/// Everything a rule may look at, upper-cased once.
struct Evidence<'a> {
    header: &'a HeaderMap,
    filename: String,
}

impl Evidence<'_> {
    fn field(&self, label: &str) -> Option<String> {
        self.header.get(label).map(str::to_uppercase)
    }
}

/// Classify a spectrum from its header records and filename.
///
/// Total and deterministic: returns [`Technique::Unknown`] when no rule
/// finds evidence.
pub fn classify(header: &HeaderMap, filename: &str) -> Technique {
    classify_traced(header, filename).0
}

/// Like [`classify`], also reporting which stage decided.
pub fn classify_traced(header: &HeaderMap, filename: &str) -> (Technique, Option<ClassifyStage>) {
    let evidence = Evidence {
        header,
        filename: filename.to_uppercase(),
    };
    RULES
        .iter()
        .find_map(|(stage, rule)| rule(&evidence).map(|t| (t, Some(*stage))))
        .unwrap_or((Technique::Unknown, None))
}

fn first_match(text: &str, table: KeywordTable) -> Option<Technique> {
    table
        .iter()
        .find(|(keywords, _)| contains_any(text, keywords))
        .map(|(_, technique)| *technique)
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

fn by_data_type(ev: &Evidence<'_>) -> Option<Technique> {
    first_match(&ev.field("datatype")?, DATA_TYPE_KEYWORDS)
}

fn by_title(ev: &Evidence<'_>) -> Option<Technique> {
    first_match(&ev.field("title")?, TITLE_KEYWORDS)
}

/// Axis units. Wavenumber against intensity is ambiguous between IR and
/// Raman; it resolves to Raman only when the title says so, else IR.
fn by_units(ev: &Evidence<'_>) -> Option<Technique> {
    let x = ev.field("xunits")?;
    let y = ev.field("yunits")?;
    let absorptive = contains_any(&y, ABSORPTIVE_UNITS);
    let emissive = contains_any(&y, EMISSIVE_UNITS);

    if contains_any(&x, WAVENUMBER_UNITS) {
        if absorptive {
            return Some(Technique::Ir);
        }
        if emissive {
            let raman_title = ev.field("title").is_some_and(|t| t.contains("RAMAN"));
            return Some(if raman_title { Technique::Raman } else { Technique::Ir });
        }
    } else if contains_any(&x, NANOMETER_UNITS) {
        if absorptive {
            return Some(Technique::UvVis);
        }
        if emissive {
            return Some(Technique::Libs);
        }
    }
    None
}

fn by_origin(ev: &Evidence<'_>) -> Option<Technique> {
    first_match(&ev.field("origin")?, ORIGIN_KEYWORDS)
}

fn by_filename(ev: &Evidence<'_>) -> Option<Technique> {
    first_match(&ev.filename, FILENAME_KEYWORDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(pairs: &[(&str, &str)]) -> HeaderMap {
        pairs.iter().copied().collect()
    }

    #[test]
    fn data_type_outranks_title() {
        let h = header(&[("DATA TYPE", "INFRARED SPECTRUM"), ("TITLE", "RAMAN TEST")]);
        assert_eq!(classify_traced(&h, "x.jdx"), (Technique::Ir, Some(ClassifyStage::DataType)));
    }

    #[test]
    fn data_type_keywords() {
        let cases = [
            ("RAMAN SPECTRUM", Technique::Raman),
            ("UV/VIS SPECTRUM", Technique::UvVis),
            ("ultraviolet", Technique::UvVis),
            ("MASS SPECTRUM", Technique::Ms),
            ("NMR SPECTRUM", Technique::Nmr),
            ("FTIR", Technique::Ir),
        ];
        for (value, expected) in cases {
            let h = header(&[("##DATA_TYPE", value)]);
            assert_eq!(classify(&h, ""), expected, "{value}");
        }
    }

    #[test]
    fn unrecognised_data_type_falls_through_to_title() {
        let h = header(&[("datatype", "LINK"), ("title", "LIBS of basalt")]);
        assert_eq!(classify_traced(&h, ""), (Technique::Libs, Some(ClassifyStage::Title)));
    }

    #[test]
    fn title_keywords() {
        assert_eq!(classify(&header(&[("TITLE", "sample X-ray scan")]), ""), Technique::Xrf);
        assert_eq!(classify(&header(&[("TITLE", "dye absorption")]), ""), Technique::UvVis);
        assert_eq!(classify(&header(&[("TITLE", "benzene IR spectrum")]), ""), Technique::Ir);
        // bare "IR" without surrounding spaces is not evidence
        assert_eq!(classify(&header(&[("TITLE", "IR")]), ""), Technique::Unknown);
    }

    #[test]
    fn units_stage() {
        let ir = header(&[("XUNITS", "1/CM"), ("YUNITS", "TRANSMITTANCE")]);
        assert_eq!(classify_traced(&ir, ""), (Technique::Ir, Some(ClassifyStage::Units)));

        let ambiguous = header(&[("XUNITS", "cm-1"), ("YUNITS", "counts")]);
        assert_eq!(classify(&ambiguous, ""), Technique::Ir);

        let uv = header(&[("XUNITS", "NANOMETERS"), ("YUNITS", "ABSORBANCE")]);
        assert_eq!(classify(&uv, ""), Technique::UvVis);

        let libs = header(&[("XUNITS", "nm"), ("YUNITS", "Intensity")]);
        assert_eq!(classify(&libs, ""), Technique::Libs);

        let partial = header(&[("XUNITS", "1/CM")]);
        assert_eq!(classify(&partial, ""), Technique::Unknown);
    }

    #[test]
    fn origin_stage() {
        let h = header(&[
            ("ORIGIN", "Bruker FTIR lab"),
            ("XUNITS", "SECONDS"),
            ("YUNITS", "VOLTS"),
        ]);
        assert_eq!(classify_traced(&h, ""), (Technique::Ir, Some(ClassifyStage::Origin)));
        assert_eq!(classify(&header(&[("ORIGIN", "raman bench")]), ""), Technique::Raman);
    }

    #[test]
    fn filename_fallback() {
        let empty = HeaderMap::new();
        assert_eq!(
            classify_traced(&empty, "108-95-2-IR.jdx"),
            (Technique::Ir, Some(ClassifyStage::Filename))
        );
        assert_eq!(classify(&empty, "quartz_raman.dx"), Technique::Raman);
        assert_eq!(classify(&empty, "dye-vis.jcamp"), Technique::UvVis);
        assert_eq!(classify(&empty, "uv_run3.txt"), Technique::UvVis);
    }

    #[test]
    fn no_evidence_is_unknown() {
        let h = header(&[("TITLE", "sample 42"), ("XUNITS", "1/CM")]);
        assert_eq!(classify_traced(&h, "sample42.jdx"), (Technique::Unknown, None));
    }
}
