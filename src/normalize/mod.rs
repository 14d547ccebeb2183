//! Canonicalization of messy free-text fields from uploaded rate sheets.
//!
//! Everything in this module is a stateless pure function over raw cell
//! values. Rate sheets are hand-maintained spreadsheets, so group names carry
//! typos, units come in a dozen spellings of the same thing, and flags are
//! whatever the author felt like typing that day. The parser leans on these
//! functions so the rest of the engine only ever sees canonical forms.

use crate::core::types::{AccreditationStatus, CellValue};

/// Known misspellings corrected before casing, keyed by lowercase token.
const MISSPELLINGS: &[(&str, &str)] = &[
    ("parametes", "parameters"),
    ("paramters", "parameters"),
    ("parmeters", "parameters"),
    ("anaylsis", "analysis"),
    ("anlysis", "analysis"),
    ("chemcial", "chemical"),
    ("microbiologial", "microbiological"),
];

/// Unit variant table: folded spelling -> canonical spelling.
///
/// Lookup keys are produced by [`fold_unit`]: lowercased, whitespace
/// stripped, superscript exponents and the micro sign reduced to ASCII.
const UNIT_VARIANTS: &[(&str, &str)] = &[
    ("mg/l", "mg/L"),
    ("mgl-1", "mg/L"),
    ("mg/l-1", "mg/L"),
    ("mgperl", "mg/L"),
    ("ug/l", "µg/L"),
    ("ugl-1", "µg/L"),
    ("ug/m3", "µg/m³"),
    ("ugm-3", "µg/m³"),
    ("ugm3", "µg/m³"),
    ("mg/m3", "mg/m³"),
    ("mgm-3", "mg/m³"),
    ("g/l", "g/L"),
    ("gl-1", "g/L"),
    ("ppm", "ppm"),
    ("%", "%"),
    ("percent", "%"),
    ("degc", "°C"),
    ("deg.c", "°C"),
    ("celsius", "°C"),
    ("degreecelsius", "°C"),
    ("degreescelsius", "°C"),
    ("ntu", "NTU"),
    ("ph", "pH"),
    ("phunits", "pH"),
    ("db(a)", "dB(A)"),
    ("dba", "dB(A)"),
    ("db-a", "dB(A)"),
    ("mpn/100ml", "MPN/100mL"),
    ("cfu/ml", "CFU/mL"),
    ("cfu/g", "CFU/g"),
];

/// Normalize a group/section heading to hyphen-aware title case.
///
/// Blank input is `None`. Known misspellings are corrected before casing, so
/// "physico-chemical parametes" becomes "Physico-Chemical Parameters". Runs
/// of internal whitespace collapse to a single space.
#[must_use]
pub fn normalize_group(raw: &CellValue) -> Option<String> {
    let text = string_or_null(raw)?;
    let corrected: Vec<String> = text
        .split_whitespace()
        .map(|token| {
            let lower = token.to_lowercase();
            MISSPELLINGS
                .iter()
                .find(|(wrong, _)| *wrong == lower)
                .map(|(_, right)| (*right).to_string())
                .unwrap_or_else(|| token.to_string())
        })
        .collect();
    Some(title_case(&corrected.join(" ")))
}

/// Map a unit spelling to its canonical form.
///
/// Recognizes superscript exponent notation (`mg l⁻¹`) and ASCII look-alikes
/// (`mgl-1`, `ug/m3`), case- and whitespace-insensitively. Unrecognized
/// non-empty input is returned trimmed but otherwise unchanged; units are
/// never silently dropped.
#[must_use]
pub fn normalize_unit(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let folded = fold_unit(trimmed);
    let canonical = UNIT_VARIANTS
        .iter()
        .find(|(variant, _)| *variant == folded)
        .map(|(_, canonical)| (*canonical).to_string());
    Some(canonical.unwrap_or_else(|| trimmed.to_string()))
}

/// Reduce a unit spelling to its lookup key.
fn fold_unit(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| match c {
            '⁻' => vec!['-'],
            '¹' => vec!['1'],
            '²' => vec!['2'],
            '³' => vec!['3'],
            'µ' | 'μ' => vec!['u'],
            '°' => "deg".chars().collect(),
            _ => c.to_lowercase().collect(),
        })
        .collect()
}

/// Interpret an accreditation flag.
///
/// The affirmative / negative / not-applicable token sets are disjoint by
/// construction; anything outside them is `None`.
#[must_use]
pub fn normalize_accreditation(raw: &CellValue) -> Option<AccreditationStatus> {
    match raw {
        CellValue::Bool(true) => return Some(AccreditationStatus::Yes),
        CellValue::Bool(false) => return Some(AccreditationStatus::No),
        CellValue::Number(n) if *n == 1.0 => return Some(AccreditationStatus::Yes),
        CellValue::Number(n) if *n == 0.0 => return Some(AccreditationStatus::No),
        _ => {}
    }
    let text = string_or_null(raw)?;
    match text.to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(AccreditationStatus::Yes),
        "no" | "n" | "false" | "0" => Some(AccreditationStatus::No),
        "na" | "n/a" | "n.a." | "not applicable" | "not available" => {
            Some(AccreditationStatus::NotApplicable)
        }
        _ => None,
    }
}

/// Coerce a cell to a trimmed string, or `None` when there is nothing there.
///
/// Numbers stringify (integral floats without a trailing `.0`), booleans
/// stringify, NaN is treated as absent.
#[must_use]
pub fn string_or_null(raw: &CellValue) -> Option<String> {
    match raw {
        CellValue::Empty => None,
        CellValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        CellValue::Number(n) => {
            if n.is_nan() {
                None
            } else if n.fract() == 0.0 && n.abs() < 1e15 {
                #[allow(clippy::cast_possible_truncation)]
                Some(format!("{}", *n as i64))
            } else {
                Some(format!("{n}"))
            }
        }
        CellValue::Bool(b) => Some(b.to_string()),
    }
}

/// Parse the integer content of a cell, or `None`.
///
/// Strings contribute their leading integer portion ("12 days" -> 12,
/// "123.789" -> 123); floats truncate toward zero. Blank cells, non-numeric
/// strings, NaN and infinities are all `None`. Total over every input.
#[must_use]
pub fn int_or_null(raw: &CellValue) -> Option<i64> {
    match raw {
        CellValue::Empty | CellValue::Bool(_) => None,
        CellValue::Number(n) => {
            if n.is_nan() || n.is_infinite() {
                None
            } else {
                #[allow(clippy::cast_possible_truncation)]
                Some(n.trunc() as i64)
            }
        }
        CellValue::Text(s) => {
            let trimmed = s.trim();
            let mut chars = trimmed.chars().peekable();
            let mut digits = String::new();
            if let Some(&c) = chars.peek() {
                if c == '-' || c == '+' {
                    digits.push(c);
                    chars.next();
                }
            }
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if digits.is_empty() || digits == "-" || digits == "+" {
                None
            } else {
                digits.parse::<i64>().ok()
            }
        }
    }
}

/// Hyphen-aware title case.
///
/// Every whitespace-delimited token is capitalized; tokens split further on
/// hyphens with each side capitalized independently, so "physico-chemical"
/// becomes "Physico-Chemical". Internal whitespace collapses to one space.
/// Empty in, empty out.
#[must_use]
pub fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|token| {
            token
                .split('-')
                .map(capitalize)
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            // Only apply single-char uppercase mappings; expanding ones
            // (like ß -> SS) would break idempotence.
            let mut upper = first.to_uppercase();
            let head = if upper.clone().count() == 1 {
                upper.next().unwrap_or(first)
            } else {
                first
            };
            std::iter::once(head)
                .chain(chars.flat_map(char::to_lowercase))
                .collect()
        }
        None => String::new(),
    }
}
