//! Data-line decoding for JCAMP-DX tables.
//!
//! A line is either plain AFFN (free-format numbers) or ASDF, the
//! character-encoded compression most instrument exports use:
//!
//! | form | characters            | meaning                              |
//! |------|-----------------------|--------------------------------------|
//! | SQZ  | `@ A-I a-i`           | absolute value, sign in the letter   |
//! | DIF  | `% J-R j-r`           | difference from the previous value   |
//! | DUP  | `S-Z s`               | repeat the previous token n-1 times  |

/// Most values, abscissa included, one data line may expand to.
pub(crate) const MAX_LINE_VALUES: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Value(f64),
    Diff(f64),
    Dup(usize),
}

/// Decoded numbers of one line: abscissa first, then ordinates.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DecodedLine {
    pub values: Vec<f64>,
    /// Last token was a difference; the next line opens with a Y-check.
    pub ends_in_dif: bool,
}

pub(crate) fn decode_line(line: &str) -> Result<DecodedLine, String> {
    if let Some(values) = parse_affn(line) {
        return Ok(DecodedLine {
            values,
            ends_in_dif: false,
        });
    }
    expand(tokenize(line)?)
}

/// Free-format numbers separated by whitespace, commas, semicolons, or a
/// sign that does not belong to an exponent. `None` if anything fails.
pub(crate) fn parse_affn(line: &str) -> Option<Vec<f64>> {
    let mut values = Vec::new();
    let mut current = String::new();

    for c in line.chars() {
        match c {
            c if c.is_whitespace() || c == ',' || c == ';' => {
                flush_affn(&mut current, &mut values)?;
            }
            '+' | '-'
                if !current.is_empty() && !current.ends_with(|p: char| p == 'e' || p == 'E') =>
            {
                flush_affn(&mut current, &mut values)?;
                current.push(c);
            }
            c => current.push(c),
        }
    }
    flush_affn(&mut current, &mut values)?;
    Some(values)
}

fn flush_affn(current: &mut String, values: &mut Vec<f64>) -> Option<()> {
    if !current.is_empty() {
        values.push(current.parse().ok()?);
        current.clear();
    }
    Some(())
}

enum Lead {
    Affn(char),
    Sqz(i8),
    Dif(i8),
    Dup(u8),
}

fn lead_of(c: char) -> Option<Lead> {
    let offset = |base: u8| (c as u8 - base) as i8 + 1;
    Some(match c {
        '0'..='9' | '.' | '+' | '-' => Lead::Affn(c),
        '@' => Lead::Sqz(0),
        'A'..='I' => Lead::Sqz(offset(b'A')),
        'a'..='i' => Lead::Sqz(-offset(b'a')),
        '%' => Lead::Dif(0),
        'J'..='R' => Lead::Dif(offset(b'J')),
        'j'..='r' => Lead::Dif(-offset(b'j')),
        'S'..='Z' => Lead::Dup(offset(b'S') as u8),
        's' => Lead::Dup(9),
        _ => return None,
    })
}

fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() || c == ',' || c == ';' {
            continue;
        }
        let lead = lead_of(c).ok_or_else(|| format!("unexpected character '{c}'"))?;

        let mut rest = String::new();
        while let Some(&d) = chars.peek() {
            if d.is_ascii_digit() || d == '.' {
                rest.push(d);
                chars.next();
            } else {
                break;
            }
        }

        let token = match lead {
            Lead::Affn(first) => {
                let text = format!("{first}{rest}");
                Token::Value(text.parse().map_err(|_| format!("bad number '{text}'"))?)
            }
            Lead::Sqz(digit) => Token::Value(signed_magnitude(digit, &rest)?),
            Lead::Dif(digit) => Token::Diff(signed_magnitude(digit, &rest)?),
            Lead::Dup(digit) => {
                let text = format!("{digit}{rest}");
                Token::Dup(text.parse().map_err(|_| format!("bad repeat count '{text}'"))?)
            }
        };
        tokens.push(token);
    }
    Ok(tokens)
}

/// Pseudo-digit `digit` (sign carried by the letter) followed by `rest`.
fn signed_magnitude(digit: i8, rest: &str) -> Result<f64, String> {
    let text = format!("{}{rest}", digit.unsigned_abs());
    let magnitude: f64 = text.parse().map_err(|_| format!("bad number '{text}'"))?;
    Ok(if digit < 0 { -magnitude } else { magnitude })
}

fn expand(tokens: Vec<Token>) -> Result<DecodedLine, String> {
    let mut values: Vec<f64> = Vec::with_capacity(tokens.len());
    let mut previous: Option<Token> = None;
    let mut ends_in_dif = false;

    for token in tokens {
        match token {
            Token::Value(v) => {
                values.push(v);
                ends_in_dif = false;
                previous = Some(token);
            }
            Token::Diff(d) => {
                push_diff(&mut values, d)?;
                ends_in_dif = true;
                previous = Some(token);
            }
            Token::Dup(count) => {
                let repeated = previous.ok_or("DUP without a preceding value")?;
                if values.len().saturating_add(count.saturating_sub(1)) > MAX_LINE_VALUES {
                    return Err(format!(
                        "DUP count {count} expands the line past {MAX_LINE_VALUES} values"
                    ));
                }
                for _ in 1..count {
                    match repeated {
                        Token::Value(v) => values.push(v),
                        Token::Diff(d) => push_diff(&mut values, d)?,
                        Token::Dup(_) => return Err("DUP follows DUP".into()),
                    }
                }
            }
        }
    }
    Ok(DecodedLine {
        values,
        ends_in_dif,
    })
}

fn push_diff(values: &mut Vec<f64>, d: f64) -> Result<(), String> {
    let base = values
        .last()
        .copied()
        .ok_or("DIF without a preceding value")?;
    values.push(base + d);
    Ok(())
}
