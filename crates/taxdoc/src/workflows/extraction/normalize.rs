use chrono::NaiveDate;

use super::domain::ValueType;

/// Canonicalize a raw observation into the field's declared value family.
///
/// Returns `None` when the raw text cannot be read as the declared type; the
/// resolver treats that as "no usable value from this candidate" and falls
/// back to the next one. Never panics.
pub fn normalize(value_type: ValueType, raw: &str) -> Option<String> {
    match value_type {
        ValueType::Money => normalize_money(raw),
        ValueType::Ssn => normalize_ssn(raw),
        ValueType::Ein => normalize_ein(raw),
        ValueType::Date => normalize_date(raw),
        ValueType::Boolean => normalize_boolean(raw),
        ValueType::Text | ValueType::Code => Some(collapse_whitespace(raw)),
    }
}

/// Whether the raw text already reads as the declared type. Drives the
/// resolver's plausibility bonus.
pub fn matches_format(value_type: ValueType, raw: &str) -> bool {
    normalize(value_type, raw).is_some()
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_money(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let negative = cleaned.starts_with('(') && cleaned.ends_with(')');
    let body = if negative {
        &cleaned[1..cleaned.len() - 1]
    } else {
        cleaned.as_str()
    };

    let amount = body.parse::<f64>().ok().filter(|value| value.is_finite())?;
    let amount = if negative { -amount } else { amount };
    Some(format!("{amount:.2}"))
}

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn normalize_ssn(raw: &str) -> Option<String> {
    let digits = digits(raw);
    if digits.len() != 9 {
        return None;
    }
    Some(format!(
        "{}-{}-{}",
        &digits[0..3],
        &digits[3..5],
        &digits[5..9]
    ))
}

fn normalize_ein(raw: &str) -> Option<String> {
    let digits = digits(raw);
    if digits.len() != 9 {
        return None;
    }
    Some(format!("{}-{}", &digits[0..2], &digits[2..9]))
}

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%Y-%m-%d"];

fn normalize_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .map(|date| date.format("%Y-%m-%d").to_string())
}

fn normalize_boolean(raw: &str) -> Option<String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "x" | "1" | "checked" => Some("true".to_string()),
        "false" | "no" | "0" | "" => Some("false".to_string()),
        _ => None,
    }
}
