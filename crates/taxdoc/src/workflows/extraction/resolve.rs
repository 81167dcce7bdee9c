use super::domain::{Candidate, ResolvedField, SourceKind, ValueType};
use super::normalize::{matches_format, normalize};

/// Confidence uplift applied to the winning score, reflecting resolver
/// certainty beyond the raw source confidence.
const RESOLVER_FLOOR_ADJUSTMENT: f32 = 0.15;

/// Bonus for values already shaped like the field expects.
const PLAUSIBILITY_BONUS: f32 = 0.2;

/// Penalty for identifier fields whose value cannot be read as one. Strict
/// formats earn the harsher penalty; it is allowed to overturn a higher base
/// confidence.
const IDENTIFIER_MISMATCH_PENALTY: f32 = 0.3;
const VALUE_MISMATCH_PENALTY: f32 = 0.2;

/// Bonus for structural provenance over free-text matching.
const STRUCTURAL_SOURCE_BONUS: f32 = 0.1;

/// Composite score for one candidate against its field's declared type.
pub fn score(value_type: ValueType, candidate: &Candidate) -> f32 {
    candidate.confidence.clamp(0.0, 1.0)
        + plausibility_bonus(value_type, &candidate.value)
        + source_bonus(candidate.source)
}

fn plausibility_bonus(value_type: ValueType, value: &str) -> f32 {
    match value_type {
        ValueType::Ssn | ValueType::Ein => {
            if matches_format(value_type, value) {
                PLAUSIBILITY_BONUS
            } else {
                -IDENTIFIER_MISMATCH_PENALTY
            }
        }
        ValueType::Money | ValueType::Date | ValueType::Boolean => {
            if matches_format(value_type, value) {
                PLAUSIBILITY_BONUS
            } else {
                -VALUE_MISMATCH_PENALTY
            }
        }
        ValueType::Text | ValueType::Code => 0.0,
    }
}

fn source_bonus(source: SourceKind) -> f32 {
    match source {
        SourceKind::Form | SourceKind::Geometry => STRUCTURAL_SOURCE_BONUS,
        _ => 0.0,
    }
}

/// Select the single value to commit for a field.
///
/// Deterministic and input-order independent: candidates are ranked by score,
/// ties broken by source priority, then by value. The winner's value must
/// survive normalization; a candidate that fails it is disqualified and the
/// next best is tried. No survivor means the field stays absent.
pub fn resolve(
    field_key: &str,
    value_type: ValueType,
    candidates: &[Candidate],
) -> Option<ResolvedField> {
    let mut ranked: Vec<(f32, &Candidate)> = candidates
        .iter()
        .map(|candidate| (score(value_type, candidate), candidate))
        .collect();

    ranked.sort_by(|(score_a, a), (score_b, b)| {
        score_b
            .total_cmp(score_a)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.value.cmp(&b.value))
    });

    for (score, candidate) in ranked {
        let Some(value) = normalize(value_type, &candidate.value) else {
            continue;
        };
        return Some(ResolvedField {
            field_key: field_key.to_string(),
            value,
            confidence: (score + RESOLVER_FLOOR_ADJUSTMENT).min(1.0),
            source: candidate.source,
            cross_validated: false,
        });
    }

    None
}
