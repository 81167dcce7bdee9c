use crate::workflows::extraction::domain::{Candidate, SourceKind, ValueType};
use crate::workflows::extraction::resolve::{resolve, score};

#[test]
fn format_penalty_overturns_higher_confidence() {
    let malformed = Candidate::new("employee_ssn", "12-345-678", 0.95, SourceKind::Query);
    let well_formed = Candidate::new("employee_ssn", "123-45-6789", 0.70, SourceKind::Regex);

    assert!(score(ValueType::Ssn, &well_formed) > score(ValueType::Ssn, &malformed));

    let field = resolve(
        "employee_ssn",
        ValueType::Ssn,
        &[malformed, well_formed],
    )
    .expect("well-formed candidate survives");
    assert_eq!(field.value, "123-45-6789");
    assert_eq!(field.source, SourceKind::Regex);
}

#[test]
fn ties_break_on_source_priority() {
    let from_table = Candidate::new("wages_income", "50000.00", 0.8, SourceKind::Table);
    let from_query = Candidate::new("wages_income", "50000.00", 0.8, SourceKind::Query);

    let field = resolve(
        "wages_income",
        ValueType::Money,
        &[from_table, from_query],
    )
    .expect("resolves");
    assert_eq!(field.source, SourceKind::Query);
}

#[test]
fn resolution_is_input_order_independent() {
    let candidates = vec![
        Candidate::new("wages_income", "50000.00", 0.8, SourceKind::Table),
        Candidate::new("wages_income", "49999.00", 0.9, SourceKind::Query),
        Candidate::new("wages_income", "50,000", 0.7, SourceKind::Geometry),
    ];
    let mut reversed = candidates.clone();
    reversed.reverse();

    let forward = resolve("wages_income", ValueType::Money, &candidates);
    let backward = resolve("wages_income", ValueType::Money, &reversed);
    assert_eq!(forward, backward);
}

#[test]
fn normalization_failure_falls_back_to_next_candidate() {
    // Top-ranked by score, but the value cannot be read as money.
    let garbled = Candidate::new("wages_income", "12,34O.00", 0.95, SourceKind::Query);
    let usable = Candidate::new("wages_income", "500.00", 0.50, SourceKind::Table);

    let field = resolve("wages_income", ValueType::Money, &[garbled, usable])
        .expect("fallback candidate survives");
    assert_eq!(field.value, "500.00");
    assert_eq!(field.source, SourceKind::Table);
}

#[test]
fn no_surviving_candidate_leaves_field_absent() {
    let candidates = vec![
        Candidate::new("employee_ssn", "not an ssn", 0.9, SourceKind::Form),
        Candidate::new("employee_ssn", "12345", 0.8, SourceKind::Regex),
    ];

    assert!(resolve("employee_ssn", ValueType::Ssn, &candidates).is_none());
}

#[test]
fn structural_sources_earn_their_bonus() {
    let from_form = Candidate::new("pay_date", "01/15/2024", 0.8, SourceKind::Form);
    let from_regex = Candidate::new("pay_date", "01/15/2024", 0.8, SourceKind::Regex);

    assert!(score(ValueType::Date, &from_form) > score(ValueType::Date, &from_regex));
}

#[test]
fn resolved_confidence_adds_floor_adjustment() {
    let candidate = Candidate::new("wages_income", "1200.00", 0.5, SourceKind::Query);

    let field = resolve("wages_income", ValueType::Money, &[candidate]).expect("resolves");
    // 0.5 base + 0.2 plausibility + 0.15 floor adjustment.
    assert!((field.confidence - 0.85).abs() < 1e-5);
}

#[test]
fn confidence_caps_at_one() {
    let candidate = Candidate::new("employee_ssn", "123-45-6789", 0.95, SourceKind::Form);

    let field = resolve("employee_ssn", ValueType::Ssn, &[candidate]).expect("resolves");
    assert_eq!(field.confidence, 1.0);
}
