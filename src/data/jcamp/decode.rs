use super::asdf::{decode_line, parse_affn};
use crate::data::error::ParseError;
use crate::data::header::HeaderMap;

/// One decoded JCAMP-DX block: arrays plus its header records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JcampBlock {
    pub header: HeaderMap,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub y_checks_dropped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TableForm {
    /// `(X++(Y..Y))`: abscissa then a run of equally spaced ordinates per line.
    XyData,
    /// `(XY..XY)`: explicit pairs.
    Pairs,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Header,
    Table,
    /// Inside a table form we do not decode.
    Skip,
}

#[derive(Debug, Default)]
struct RawBlock {
    header: HeaderMap,
    table: Option<(TableForm, usize)>,
    lines: Vec<(usize, String)>,
}

const TABLE_LABELS: [&str; 3] = ["xydata", "xypoints", "peaktable"];

/// Decode JCAMP-DX text into arrays and header records.
///
/// Compound files nest blocks between `##TITLE=` and `##END=`; the first
/// block to close with data is returned, its records layered over those of
/// the blocks enclosing it. An empty `x`/`y` means no block carried data.
pub fn decode(text: &str) -> Result<JcampBlock, ParseError> {
    let mut stack: Vec<RawBlock> = Vec::new();
    let mut current: Option<RawBlock> = None;
    let mut mode = Mode::Header;
    let mut last_label: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.split("$$").next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let Some(record) = line.strip_prefix("##") else {
            match (mode, current.as_mut()) {
                (Mode::Table, Some(block)) => block.lines.push((line_no, line.to_string())),
                (Mode::Header, Some(block)) => {
                    if let Some(label) = &last_label {
                        block.header.append(label, line);
                    }
                }
                _ => {}
            }
            continue;
        };

        let (label, value) = record.split_once('=').unwrap_or((record, ""));
        let canonical = HeaderMap::canonical_label(label);
        mode = Mode::Header;
        last_label = None;

        match canonical.as_str() {
            "title" => {
                if let Some(open) = current.take() {
                    stack.push(open);
                }
                let mut block = RawBlock::default();
                block.header.insert(label, value);
                current = Some(block);
                last_label = Some(canonical);
            }
            "end" => {
                if let Some(closed) = current.take() {
                    if let Some(found) = finish(&stack, closed)? {
                        return Ok(found);
                    }
                }
                current = stack.pop();
            }
            table if TABLE_LABELS.contains(&table) => {
                let block = current.get_or_insert_with(RawBlock::default);
                block.header.insert(label, value);
                mode = match (block.table, table_form(value)) {
                    (None, Some(form)) => {
                        block.table = Some((form, line_no));
                        Mode::Table
                    }
                    _ => Mode::Skip,
                };
            }
            _ => {
                let block = current.get_or_insert_with(RawBlock::default);
                block.header.insert(label, value);
                last_label = Some(canonical);
            }
        }
    }

    // Unterminated blocks close innermost first.
    while let Some(closed) = current.take() {
        if let Some(found) = finish(&stack, closed)? {
            return Ok(found);
        }
        current = stack.pop();
    }
    Ok(JcampBlock::default())
}

fn table_form(value: &str) -> Option<TableForm> {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if compact.contains("X++(Y..Y)") {
        Some(TableForm::XyData)
    } else if compact.contains("(XY..XY)") {
        Some(TableForm::Pairs)
    } else {
        None
    }
}

/// Decode a closed block; `None` when it carries no data.
fn finish(ancestors: &[RawBlock], block: RawBlock) -> Result<Option<JcampBlock>, ParseError> {
    let Some((form, table_line)) = block.table else {
        return Ok(None);
    };
    if block.lines.is_empty() {
        return Ok(None);
    }

    let mut header = HeaderMap::new();
    for parent in ancestors {
        header.merge_from(&parent.header);
    }
    header.merge_from(&block.header);

    let scale = Scale::from_header(&header, table_line)?;
    let mut decoded = JcampBlock {
        header,
        ..JcampBlock::default()
    };
    match form {
        TableForm::XyData => decode_xydata(&block.lines, &scale, &mut decoded)?,
        TableForm::Pairs => decode_pairs(&block.lines, &scale, table_line, &mut decoded)?,
    }
    Ok(Some(decoded))
}

struct Scale {
    x_factor: f64,
    y_factor: f64,
    /// Abscissa spacing between consecutive ordinates, when the header pins it.
    delta_x: Option<f64>,
}

impl Scale {
    fn from_header(header: &HeaderMap, line: usize) -> Result<Self, ParseError> {
        let number = |label: &str| -> Result<Option<f64>, ParseError> {
            header
                .get(label)
                .map(|v| {
                    v.parse::<f64>().map_err(|_| ParseError::MalformedJcamp {
                        line,
                        reason: format!("##{} value '{v}' is not a number", label.to_uppercase()),
                    })
                })
                .transpose()
        };

        let x_factor = number("xfactor")?.unwrap_or(1.0);
        let y_factor = number("yfactor")?.unwrap_or(1.0);
        let delta_x = match (number("firstx")?, number("lastx")?, number("npoints")?) {
            (Some(first), Some(last), Some(n)) if n > 1.0 => Some((last - first) / (n - 1.0)),
            _ => number("deltax")?,
        };
        Ok(Self {
            x_factor,
            y_factor,
            delta_x,
        })
    }
}

struct XyLine {
    x0: f64,
    ordinates: Vec<f64>,
    /// Leading ordinates that repeat the previous line (DIF Y-check).
    skip: usize,
}

fn decode_xydata(
    lines: &[(usize, String)],
    scale: &Scale,
    out: &mut JcampBlock,
) -> Result<(), ParseError> {
    let mut rows: Vec<XyLine> = Vec::with_capacity(lines.len());
    let mut previous_dif = false;

    for (line_no, text) in lines {
        let decoded = decode_line(text).map_err(|reason| ParseError::MalformedJcamp {
            line: *line_no,
            reason,
        })?;
        let Some((&x0, ordinates)) = decoded.values.split_first() else {
            continue;
        };
        let skip = usize::from(previous_dif && !ordinates.is_empty());
        previous_dif = decoded.ends_in_dif;
        rows.push(XyLine {
            x0: x0 * scale.x_factor,
            ordinates: ordinates.to_vec(),
            skip,
        });
    }

    let mut estimated_step = 0.0;
    for (i, row) in rows.iter().enumerate() {
        let step = match scale.delta_x {
            Some(step) => step,
            None => {
                if let Some(next) = rows.get(i + 1) {
                    // a Y-check on the next line sits on this line's last abscissa
                    let spans = row.ordinates.len().saturating_sub(next.skip);
                    if spans > 0 {
                        estimated_step = (next.x0 - row.x0) / spans as f64;
                    }
                }
                estimated_step
            }
        };

        out.y_checks_dropped += row.skip;
        for (j, y) in row.ordinates.iter().enumerate().skip(row.skip) {
            out.x.push(row.x0 + j as f64 * step);
            out.y.push(y * scale.y_factor);
        }
    }
    Ok(())
}

fn decode_pairs(
    lines: &[(usize, String)],
    scale: &Scale,
    table_line: usize,
    out: &mut JcampBlock,
) -> Result<(), ParseError> {
    let mut values = Vec::new();
    for (line_no, text) in lines {
        let parsed = parse_affn(text).ok_or_else(|| ParseError::MalformedJcamp {
            line: *line_no,
            reason: format!("'{text}' is not a list of numbers"),
        })?;
        values.extend(parsed);
    }
    if values.len() % 2 != 0 {
        return Err(ParseError::MalformedJcamp {
            line: table_line,
            reason: format!("(XY..XY) table holds an odd count of {} values", values.len()),
        });
    }
    for pair in values.chunks_exact(2) {
        out.x.push(pair[0] * scale.x_factor);
        out.y.push(pair[1] * scale.y_factor);
    }
    Ok(())
}
