use super::common::field_map;
use crate::workflows::extraction::domain::{DocumentType, ValidationStatus};
use crate::workflows::extraction::validate::validate;

#[test]
fn social_security_tax_outside_tolerance_warns() {
    let fields = field_map(&[
        ("social_security_wages", "50000.00"),
        ("social_security_tax", "3225.00"),
    ]);

    // 6.2% of 50000 is 3100; a 125 dollar gap exceeds the 50 dollar slack.
    let result = validate(DocumentType::W2, &fields);
    assert_eq!(result.status, ValidationStatus::Passed);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("social security tax"));
}

#[test]
fn social_security_tax_within_tolerance_is_silent() {
    let fields = field_map(&[
        ("social_security_wages", "50000.00"),
        ("social_security_tax", "3100.00"),
    ]);

    let result = validate(DocumentType::W2, &fields);
    assert!(result.warnings.is_empty());
    assert!(result.errors.is_empty());
    assert!(!result.needs_review);
}

#[test]
fn medicare_wage_gap_is_an_error() {
    let fields = field_map(&[
        ("wages_income", "50000.00"),
        ("medicare_wages", "40000.00"),
    ]);

    let result = validate(DocumentType::W2, &fields);
    assert_eq!(result.status, ValidationStatus::Failed);
    assert!(result.needs_review);
    assert!(result.errors[0].contains("medicare wages"));
}

#[test]
fn malformed_identifiers_fail_w2_validation() {
    let fields = field_map(&[("employee_ssn", "12-345-678"), ("employer_ein", "12-3456789")]);

    let result = validate(DocumentType::W2, &fields);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("employee_ssn"));
}

#[test]
fn refund_must_reconcile_with_overpayment() {
    let fields = field_map(&[
        ("total_payments", "12000.00"),
        ("total_tax", "10000.00"),
        ("refund_amount", "1500.00"),
    ]);

    let result = validate(DocumentType::Form1040, &fields);
    assert_eq!(result.status, ValidationStatus::Failed);
    assert!(result.errors[0].contains("refund"));

    let fields = field_map(&[
        ("total_payments", "12000.00"),
        ("total_tax", "10000.00"),
        ("refund_amount", "2000.00"),
    ]);
    let result = validate(DocumentType::Form1040, &fields);
    assert!(result.errors.is_empty());
}

#[test]
fn balance_due_expects_amount_owed() {
    let fields = field_map(&[("total_payments", "8000.00"), ("total_tax", "10000.00")]);

    let result = validate(DocumentType::Form1040, &fields);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("balance due"));
}

#[test]
fn extreme_effective_tax_rate_warns() {
    let fields = field_map(&[
        ("agi", "10000.00"),
        ("total_tax", "6000.00"),
        ("total_payments", "6000.00"),
    ]);

    let result = validate(DocumentType::Form1040, &fields);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("effective tax rate"));
}

#[test]
fn nonemployee_compensation_must_be_positive() {
    let fields = field_map(&[("nonemployee_compensation", "0.00")]);

    let result = validate(DocumentType::Form1099Nec, &fields);
    assert_eq!(result.status, ValidationStatus::Failed);
}

#[test]
fn withholding_exceeding_compensation_is_an_error() {
    let fields = field_map(&[
        ("nonemployee_compensation", "1000.00"),
        ("federal_tax_withheld", "1500.00"),
    ]);

    let result = validate(DocumentType::Form1099Nec, &fields);
    assert!(result.errors[0].contains("exceeds compensation"));
}

#[test]
fn high_withholding_rate_warns() {
    let fields = field_map(&[
        ("nonemployee_compensation", "1000.00"),
        ("federal_tax_withheld", "600.00"),
    ]);

    let result = validate(DocumentType::Form1099Nec, &fields);
    assert!(result.errors.is_empty());
    assert_eq!(result.warnings.len(), 1);
}

#[test]
fn qualified_dividends_cannot_exceed_ordinary() {
    let fields = field_map(&[
        ("ordinary_dividends", "500.00"),
        ("qualified_dividends", "600.00"),
    ]);

    let result = validate(DocumentType::Form1099Div, &fields);
    assert_eq!(result.status, ValidationStatus::Failed);
    assert!(result
        .errors
        .iter()
        .any(|error| error.contains("qualified dividends exceed ordinary dividends")));
}

#[test]
fn dividend_slack_of_one_dollar_is_allowed() {
    let fields = field_map(&[
        ("ordinary_dividends", "500.00"),
        ("qualified_dividends", "500.50"),
    ]);

    let result = validate(DocumentType::Form1099Div, &fields);
    assert!(result.errors.is_empty());
}

#[test]
fn two_warnings_alone_do_not_force_review() {
    let fields = field_map(&[
        ("social_security_wages", "50000.00"),
        ("social_security_tax", "4000.00"),
        ("medicare_wages", "50000.00"),
        ("medicare_tax", "1000.00"),
    ]);

    let result = validate(DocumentType::W2, &fields);
    assert_eq!(result.warnings.len(), 2);
    assert!(result.errors.is_empty());
    assert!(!result.needs_review);
}

#[test]
fn paystub_ytd_below_current_period_warns() {
    let fields = field_map(&[("gross_current", "2500.00"), ("gross_ytd", "1200.00")]);

    let result = validate(DocumentType::Paystub, &fields);
    assert_eq!(result.warnings.len(), 1);
}
