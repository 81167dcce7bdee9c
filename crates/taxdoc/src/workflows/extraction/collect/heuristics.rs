use super::super::domain::{Candidate, SourceKind};
use super::super::schema::FieldSchema;
use super::GEOMETRY_CONFIDENCE;

/// Positional fallback: treat each `label: value` line as a weak key/value
/// observation. Catches fields the structural engine missed because the form
/// was rendered as flowing text.
pub(crate) fn line_candidates(raw_text: &str, schema: &FieldSchema) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for line in raw_text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let Some(spec) = schema.match_label(label) else {
            continue;
        };
        candidates.push(Candidate::new(
            spec.key.clone(),
            value,
            GEOMETRY_CONFIDENCE,
            SourceKind::Geometry,
        ));
    }

    candidates
}
