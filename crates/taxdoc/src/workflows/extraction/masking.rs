use std::collections::BTreeMap;

use serde_json::Value;

use super::domain::{ExtractionRecord, ValueType};
use super::schema::FieldSchema;

/// Redact identifier fields on the output-facing copy of the record.
///
/// Only the exported map is touched; the record the validation engine saw is
/// left intact. Each masked field keeps its original key and gains a sibling
/// `{field}_masked = true` marker.
pub fn masked_field_map(record: &ExtractionRecord, schema: Option<&FieldSchema>) -> BTreeMap<String, Value> {
    let mut output = BTreeMap::new();

    for (key, field) in &record.resolved_fields {
        let value_type = schema.and_then(|schema| schema.value_type(key));
        let masked = match value_type {
            Some(ValueType::Ssn) => Some(mask_ssn(&field.value)),
            Some(ValueType::Ein) => Some(mask_ein(&field.value)),
            _ => None,
        };

        match masked {
            Some(masked) => {
                output.insert(key.clone(), Value::String(masked));
                output.insert(format!("{key}_masked"), Value::Bool(true));
            }
            None => {
                output.insert(key.clone(), Value::String(field.value.clone()));
            }
        }
    }

    output
}

/// `###-##-####` → `***-**-####`. Values too short to keep four digits are
/// fully redacted.
pub fn mask_ssn(value: &str) -> String {
    let digits: Vec<char> = value.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return "***-**-****".to_string();
    }
    let last_four: String = digits[digits.len() - 4..].iter().collect();
    format!("***-**-{last_four}")
}

/// `##-#######` → `**-*****##`.
pub fn mask_ein(value: &str) -> String {
    let digits: Vec<char> = value.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 2 {
        return "**-*******".to_string();
    }
    let last_two: String = digits[digits.len() - 2..].iter().collect();
    format!("**-*****{last_two}")
}
