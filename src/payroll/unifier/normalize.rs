//! Per-cell value coercion and text normalization.
//!
//! Source workbooks are dirty: amounts arrive as text with locale decimal
//! separators, placeholder dashes stand in for zero, and identity fields
//! carry float artifacts and mis-decoded accents. Every rule here degrades
//! silently to zero or empty text instead of raising; downstream
//! reconciliation totals depend on that exact behavior.

use calamine::DataType;
use chrono::{Duration, NaiveDate};

/// Output delimiter of the pipe-delimited extracts. Any occurrence inside a
/// text field is replaced to keep the column count intact.
pub const FIELD_DELIMITER: char = '|';

/// Known mis-decoded multi-byte sequences repaired to the intended
/// character before diacritics are stripped. The bare `Ã` entry must stay
/// last: it is a prefix of every other sequence.
const MOJIBAKE_REPAIRS: [(&str, &str); 12] = [
    ("Ã¡", "á"),
    ("Ã©", "é"),
    ("Ã‰", "É"),
    ("Ã­", "í"),
    ("Ã³", "ó"),
    ("Ã“", "Ó"),
    ("Ãº", "ú"),
    ("Ãš", "Ú"),
    ("Ã±", "ñ"),
    ("Ã‘", "Ñ"),
    ("Âº", "°"),
    ("Ã", "Í"),
];

/// Parses amount text into a decimal value.
///
/// Empty text, the placeholder `-`, and unparseable input all coerce to
/// zero. `,` is accepted as decimal separator; with multiple `.` present,
/// all but the last are folded into the integer portion.
pub fn parse_amount(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed.eq_ignore_ascii_case("nan") {
        return 0.0;
    }

    let mut normalized = trimmed.replace(',', ".");
    if normalized.matches('.').count() > 1 {
        if let Some((integer, decimal)) = normalized.rsplit_once('.') {
            normalized = format!("{}.{decimal}", integer.replace('.', ""));
        }
    }

    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Coerces a raw cell into a decimal amount, applying [`parse_amount`] to
/// text cells. Dates and error cells degrade to zero.
pub fn coerce_numeric(cell: &DataType) -> f64 {
    match cell {
        DataType::Empty => 0.0,
        DataType::Float(value) if value.is_finite() => *value,
        DataType::Float(_) => 0.0,
        DataType::Int(value) => *value as f64,
        DataType::Bool(value) => {
            if *value {
                1.0
            } else {
                0.0
            }
        }
        DataType::String(value) => parse_amount(value),
        _ => 0.0,
    }
}

/// Renders an amount with exactly two decimal digits and `.` separator.
pub fn render_amount(value: f64) -> String {
    format!("{value:.2}")
}

/// Produces the serialized form of a monetary column (positions 9-24).
pub fn numeric_field(cell: &DataType) -> String {
    render_amount(coerce_numeric(cell))
}

/// Produces the serialized form of an identity/text column (positions 1-8).
///
/// Numeric identity values (government IDs stored as floats) lose their
/// trailing `.0`; date cells render as `YYYY-MM-DD`.
pub fn identity_field(cell: &DataType, strip_diacritics: bool) -> String {
    match cell {
        DataType::Empty | DataType::Error(_) => String::new(),
        DataType::String(value) => normalize_text(value, strip_diacritics),
        DataType::Float(value) => integer_text(*value),
        DataType::Int(value) => value.to_string(),
        DataType::Bool(value) => value.to_string(),
        DataType::DateTime(serial) => date_from_serial(*serial),
        other => normalize_text(&other.to_string(), strip_diacritics),
    }
}

/// True for cells that count as empty when testing the stop condition.
pub fn is_empty_cell(cell: &DataType) -> bool {
    match cell {
        DataType::Empty => true,
        DataType::String(value) => value.trim().is_empty(),
        _ => false,
    }
}

/// Normalizes a text value for CSV output.
///
/// Trims surrounding whitespace; when `strip_diacritics` is set, repairs
/// known mojibake sequences and replaces accented characters with their
/// plain equivalents. The output delimiter is always sanitized regardless
/// of the flag.
pub fn normalize_text(raw: &str, strip_diacritics: bool) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let text = if strip_diacritics {
        fold_diacritics(&repair_mojibake(trimmed))
    } else {
        trimmed.to_string()
    };

    text.replace(FIELD_DELIMITER, "-")
}

fn repair_mojibake(text: &str) -> String {
    let mut repaired = text.to_string();
    for (broken, intended) in MOJIBAKE_REPAIRS {
        if repaired.contains(broken) {
            repaired = repaired.replace(broken, intended);
        }
    }
    repaired
}

fn fold_diacritics(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

fn fold_char(ch: char) -> char {
    match ch {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'Á' | 'À' | 'Ä' | 'Â' => 'A',
        'É' | 'È' | 'Ë' | 'Ê' => 'E',
        'Í' | 'Ì' | 'Ï' | 'Î' => 'I',
        'Ó' | 'Ò' | 'Ö' | 'Ô' => 'O',
        'Ú' | 'Ù' | 'Ü' | 'Û' => 'U',
        'Ñ' => 'N',
        other => other,
    }
}

fn integer_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let rendered = value.to_string();
        rendered
            .strip_suffix(".0")
            .map(str::to_string)
            .unwrap_or(rendered)
    }
}

fn date_from_serial(serial: f64) -> String {
    // Excel serial day 1 is 1900-01-01; the 1899-12-30 base absorbs the
    // historical 1900 leap-year offset.
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|base| base.checked_add_signed(Duration::days(serial as i64)))
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
