mod heuristics;
mod tables;

use std::collections::BTreeMap;

use tracing::warn;

use super::domain::{Candidate, SourceKind, ValueType};
use super::schema::{normalize_label, FieldSchema};
use super::sources::{SourceError, SourceOutputs};

pub(crate) const FORM_CONFIDENCE: f32 = 0.85;
pub(crate) const TABLE_CONFIDENCE: f32 = 0.80;
pub(crate) const GEOMETRY_CONFIDENCE: f32 = 0.70;

/// Cap on invented field keys when collecting from an unknown document type.
const DISCOVERY_LIMIT: usize = 24;

/// Candidates gathered for one document, grouped by field key, plus the
/// sources that failed to contribute.
#[derive(Debug, Default)]
pub struct CollectedCandidates {
    by_field: BTreeMap<String, Vec<Candidate>>,
    pub source_failures: Vec<(SourceKind, SourceError)>,
}

impl CollectedCandidates {
    pub fn candidates(&self, field_key: &str) -> &[Candidate] {
        self.by_field
            .get(field_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn field_keys(&self) -> impl Iterator<Item = &String> {
        self.by_field.keys()
    }

    pub fn total(&self) -> usize {
        self.by_field.values().map(Vec::len).sum()
    }

    fn push(&mut self, candidate: Candidate) {
        self.by_field
            .entry(candidate.field_key.clone())
            .or_default()
            .push(candidate);
    }

    fn record_failure(&mut self, source: SourceKind, error: SourceError) {
        warn!(source = source.label(), %error, "extraction source failed");
        self.source_failures.push((source, error));
    }
}

/// Gather raw (value, confidence, source) observations for every schema
/// field. Each source contributes independently; a failed or empty source
/// never blocks the others.
pub fn collect(
    sources: &SourceOutputs,
    raw_text: &str,
    schema: &FieldSchema,
) -> CollectedCandidates {
    let mut collected = CollectedCandidates::default();

    match &sources.queries {
        Ok(answers) => {
            for answer in answers {
                let Some(spec) = schema.match_query(&answer.query) else {
                    continue;
                };
                if answer.answer.trim().is_empty() {
                    continue;
                }
                collected.push(Candidate {
                    field_key: spec.key.clone(),
                    value: answer.answer.trim().to_string(),
                    confidence: answer.confidence.clamp(0.0, 1.0),
                    source: SourceKind::Query,
                    page: answer.page,
                    geometry: None,
                });
            }
        }
        Err(error) => collected.record_failure(SourceKind::Query, error.clone()),
    }

    match &sources.forms {
        Ok(fields) => {
            for field in fields {
                let Some(spec) = schema.match_label(&field.label) else {
                    continue;
                };
                if field.value.trim().is_empty() {
                    continue;
                }
                collected.push(Candidate {
                    field_key: spec.key.clone(),
                    value: field.value.trim().to_string(),
                    confidence: FORM_CONFIDENCE,
                    source: SourceKind::Form,
                    page: field.page,
                    geometry: field.geometry,
                });
            }
        }
        Err(error) => collected.record_failure(SourceKind::Form, error.clone()),
    }

    match &sources.tables {
        Ok(blocks) => {
            for candidate in tables::table_candidates(schema, blocks) {
                collected.push(candidate);
            }
        }
        Err(error) => collected.record_failure(SourceKind::Table, error.clone()),
    }

    for candidate in regex_candidates(raw_text, schema, None) {
        collected.push(candidate);
    }

    for candidate in heuristics::line_candidates(raw_text, schema) {
        collected.push(candidate);
    }

    collected
}

/// Pattern-library sweep over the raw text. Used both as a Layer-1 source and
/// as the Layer-3 safety net (restricted to `only` there). First match per
/// field only.
pub fn regex_candidates(
    raw_text: &str,
    schema: &FieldSchema,
    only: Option<&[String]>,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for spec in schema.fields() {
        if only.is_some_and(|keys| !keys.contains(&spec.key)) {
            continue;
        }
        let Some(pattern) = spec.pattern.as_ref() else {
            continue;
        };
        let Some(captures) = pattern.captures(raw_text) else {
            continue;
        };
        let matched = captures
            .get(1)
            .or_else(|| captures.get(0))
            .map(|m| m.as_str().trim().to_string())
            .filter(|value| !value.is_empty());
        let Some(value) = matched else {
            continue;
        };

        candidates.push(Candidate::new(
            spec.key.clone(),
            value,
            pattern_confidence(spec.value_type),
            SourceKind::Regex,
        ));
    }
    candidates
}

/// Tighter patterns earn more trust: identifier formats are near-unambiguous,
/// free-text money amounts much less so.
fn pattern_confidence(value_type: ValueType) -> f32 {
    match value_type {
        ValueType::Ssn | ValueType::Ein => 0.90,
        ValueType::Date => 0.80,
        ValueType::Money => 0.75,
        ValueType::Text | ValueType::Code | ValueType::Boolean => 0.70,
    }
}

/// Bounded discovery for unknown document types: admit alias-normalized keys
/// the schema registry has never heard of, capped at a fixed budget. Never
/// used when an active schema is in play.
pub fn discover(sources: &SourceOutputs, raw_text: &str) -> BTreeMap<String, Vec<Candidate>> {
    let mut discovered: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
    let mut admit = |label: &str, value: &str, confidence: f32, source: SourceKind, page: u32| {
        let key = discovery_key(label);
        if key.is_empty() || value.trim().is_empty() {
            return;
        }
        if discovered.len() >= DISCOVERY_LIMIT && !discovered.contains_key(&key) {
            return;
        }
        discovered.entry(key.clone()).or_default().push(Candidate {
            field_key: key,
            value: value.trim().to_string(),
            confidence,
            source,
            page,
            geometry: None,
        });
    };

    if let Ok(fields) = &sources.forms {
        for field in fields {
            admit(
                &field.label,
                &field.value,
                FORM_CONFIDENCE,
                SourceKind::Form,
                field.page,
            );
        }
    }

    for line in raw_text.lines() {
        if let Some((label, value)) = line.split_once(':') {
            admit(label, value, GEOMETRY_CONFIDENCE, SourceKind::Geometry, 1);
        }
    }

    discovered
}

fn discovery_key(label: &str) -> String {
    normalize_label(label)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}
