//! Numeric extraction for the keyword fallback parser.
//!
//! Finds numbers (digits or spelled-out words) in a lowercase transcript and
//! attaches the unit word that follows them, if any. Lengths are converted to
//! meters; angles stay in degrees.

use serde::{Deserialize, Serialize};

/// Which number a pattern group wants from the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    #[default]
    None,
    Distance,
    Angle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Length,
    Angle,
}

/// A number found in the transcript, with its unit if one was spoken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Meters for lengths, degrees for angles, raw value when unitless.
    pub value: f64,
    pub unit: Option<UnitKind>,
}

/// Pick the first measurement compatible with `quantity`.
///
/// Unitless numbers are compatible with both distance and angle.
pub fn pick(quantity: Quantity, text: &str) -> Option<f64> {
    let wanted = match quantity {
        Quantity::None => return None,
        Quantity::Distance => UnitKind::Length,
        Quantity::Angle => UnitKind::Angle,
    };
    measurements(text)
        .into_iter()
        .find(|m| m.unit.is_none_or(|unit| unit == wanted))
        .map(|m| m.value)
}

/// All measurements in order of appearance.
pub fn measurements(text: &str) -> Vec<Measurement> {
    let tokens = tokenize(text);
    let mut found = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let (value, consumed) = if let Ok(n) = tokens[i].replace(',', "").parse::<f64>() {
            (n, 1)
        } else if let Some((n, used)) = spelled_number(&tokens[i..]) {
            (n, used)
        } else {
            i += 1;
            continue;
        };
        i += consumed;

        let mut measurement = Measurement { value, unit: None };
        if let Some(unit) = tokens.get(i).and_then(|t| unit_of(t)) {
            measurement.value = value * unit.0;
            measurement.unit = Some(unit.1);
            i += 1;
        }
        found.push(measurement);
    }

    found
}

/// Split into number literals, lowercase words, and the degree sign.
///
/// Digit groups separated by commas ("1,000") stay one literal.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let end = if c.is_ascii_digit() {
            let mut end = start + 1;
            let mut seen_dot = false;
            while let Some(&(i, next)) = chars.peek() {
                let is_fraction = next == '.'
                    && !seen_dot
                    && text[i + 1..].starts_with(|d: char| d.is_ascii_digit());
                let is_grouping = next == ',' && !seen_dot && is_digit_group(&text[i + 1..]);
                if next.is_ascii_digit() || is_fraction || is_grouping {
                    seen_dot |= next == '.';
                    end = i + 1;
                    chars.next();
                } else {
                    break;
                }
            }
            end
        } else if c.is_ascii_lowercase() {
            let mut end = start + 1;
            while let Some(&(i, next)) = chars.peek() {
                if next.is_ascii_lowercase() {
                    end = i + 1;
                    chars.next();
                } else {
                    break;
                }
            }
            end
        } else if c == '°' {
            start + c.len_utf8()
        } else {
            continue;
        };
        tokens.push(&text[start..end]);
    }

    tokens
}

/// Exactly three digits, not followed by another digit.
fn is_digit_group(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.len() >= 3
        && bytes[..3].iter().all(u8::is_ascii_digit)
        && !bytes.get(3).is_some_and(u8::is_ascii_digit)
}

/// Unit word → (scale to canonical unit, kind).
fn unit_of(token: &str) -> Option<(f64, UnitKind)> {
    let unit = match token {
        "m" | "meter" | "meters" | "metre" | "metres" => (1.0, UnitKind::Length),
        "cm" | "centimeter" | "centimeters" | "centimetre" | "centimetres" => {
            (0.01, UnitKind::Length)
        }
        "ft" | "foot" | "feet" => (0.3048, UnitKind::Length),
        "deg" | "degree" | "degrees" | "°" => (1.0, UnitKind::Angle),
        _ => return None,
    };
    Some(unit)
}

fn small_number(word: &str) -> Option<f64> {
    let n = match word {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        _ => return None,
    };
    Some(n as f64)
}

fn tens(word: &str) -> Option<f64> {
    let n = match word {
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(n as f64)
}

/// Read a run of number words ("forty five", "one hundred eighty",
/// "two point five").
/// Returns the value and how many tokens were consumed.
fn spelled_number(tokens: &[&str]) -> Option<(f64, usize)> {
    let mut total = 0.0;
    let mut used = 0;
    let mut seen = false;

    for (idx, token) in tokens.iter().enumerate() {
        if let Some(n) = small_number(token).or_else(|| tens(token)) {
            total += n;
            seen = true;
            used = idx + 1;
        } else if *token == "hundred" && seen {
            total *= 100.0;
            used = idx + 1;
        } else if *token == "and" && seen {
            continue;
        } else if *token == "point" && seen {
            let digits: Vec<f64> = tokens[idx + 1..]
                .iter()
                .map_while(|t| small_number(t).filter(|d| *d < 10.0))
                .collect();
            let mut scale = 0.1;
            for digit in &digits {
                total += digit * scale;
                scale /= 10.0;
            }
            if !digits.is_empty() {
                used = idx + 1 + digits.len();
            }
            break;
        } else {
            break;
        }
    }

    seen.then_some((total, used))
}
