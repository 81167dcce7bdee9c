use std::collections::BTreeMap;

use super::super::domain::{ResolvedField, ValueType};
use super::super::normalize::matches_format;
use super::Findings;

const SOCIAL_SECURITY_RATE: f64 = 0.062;
const SOCIAL_SECURITY_TOLERANCE: f64 = 50.0;
const MEDICARE_RATE: f64 = 0.0145;
const MEDICARE_TOLERANCE: f64 = 25.0;
const MEDICARE_WAGE_GAP: f64 = 100.0;
const RECONCILIATION_TOLERANCE: f64 = 1.0;
const EFFECTIVE_RATE_CEILING: f64 = 0.5;
const WITHHOLDING_RATE_CEILING: f64 = 0.5;
const DIVIDEND_TOLERANCE: f64 = 1.0;

type FieldMap = BTreeMap<String, ResolvedField>;

fn amount(fields: &FieldMap, key: &str) -> Option<f64> {
    fields.get(key).and_then(ResolvedField::amount)
}

fn check_identifier(fields: &FieldMap, key: &str, value_type: ValueType, findings: &mut Findings) {
    let Some(field) = fields.get(key) else {
        return;
    };
    if !matches_format(value_type, &field.value) {
        findings.error(format!("{key} '{}' is not a valid identifier", field.value));
    }
}

pub(crate) fn w2(fields: &FieldMap, findings: &mut Findings) {
    check_identifier(fields, "employee_ssn", ValueType::Ssn, findings);
    check_identifier(fields, "employer_ein", ValueType::Ein, findings);

    if let (Some(ss_wages), Some(ss_tax)) = (
        amount(fields, "social_security_wages"),
        amount(fields, "social_security_tax"),
    ) {
        let expected = ss_wages * SOCIAL_SECURITY_RATE;
        if (ss_tax - expected).abs() > SOCIAL_SECURITY_TOLERANCE {
            findings.warning(format!(
                "social security tax {ss_tax:.2} deviates from 6.2% of wages (expected {expected:.2})"
            ));
        }
    }

    if let (Some(medicare_wages), Some(medicare_tax)) = (
        amount(fields, "medicare_wages"),
        amount(fields, "medicare_tax"),
    ) {
        let expected = medicare_wages * MEDICARE_RATE;
        if (medicare_tax - expected).abs() > MEDICARE_TOLERANCE {
            findings.warning(format!(
                "medicare tax {medicare_tax:.2} deviates from 1.45% of wages (expected {expected:.2})"
            ));
        }
    }

    if let (Some(medicare_wages), Some(wages)) = (
        amount(fields, "medicare_wages"),
        amount(fields, "wages_income"),
    ) {
        if medicare_wages < wages - MEDICARE_WAGE_GAP {
            findings.error(format!(
                "medicare wages {medicare_wages:.2} fall more than {MEDICARE_WAGE_GAP:.0} below box 1 wages {wages:.2}"
            ));
        }
    }
}

pub(crate) fn form_1040(fields: &FieldMap, findings: &mut Findings) {
    check_identifier(fields, "taxpayer_ssn", ValueType::Ssn, findings);

    if let (Some(total_payments), Some(total_tax)) = (
        amount(fields, "total_payments"),
        amount(fields, "total_tax"),
    ) {
        let diff = total_payments - total_tax;
        if diff > RECONCILIATION_TOLERANCE {
            match amount(fields, "refund_amount") {
                Some(refund) if (refund - diff).abs() <= RECONCILIATION_TOLERANCE => {}
                Some(refund) => findings.error(format!(
                    "refund {refund:.2} does not reconcile with overpayment {diff:.2}"
                )),
                None => findings.error(format!(
                    "overpayment of {diff:.2} but no refund amount reported"
                )),
            }
        } else if diff < -RECONCILIATION_TOLERANCE {
            let owed = -diff;
            match amount(fields, "amount_owed") {
                Some(reported) if (reported - owed).abs() <= RECONCILIATION_TOLERANCE => {}
                Some(reported) => findings.error(format!(
                    "amount owed {reported:.2} does not reconcile with balance due {owed:.2}"
                )),
                None => findings.error(format!(
                    "balance due of {owed:.2} but no amount owed reported"
                )),
            }
        }
    }

    if let (Some(total_tax), Some(agi)) = (amount(fields, "total_tax"), amount(fields, "agi")) {
        if agi > 0.0 && total_tax / agi > EFFECTIVE_RATE_CEILING {
            findings.warning(format!(
                "effective tax rate {:.1}% exceeds 50% of adjusted gross income",
                total_tax / agi * 100.0
            ));
        }
    }
}

pub(crate) fn form_1099_nec(fields: &FieldMap, findings: &mut Findings) {
    check_identifier(fields, "payer_ein", ValueType::Ein, findings);
    check_identifier(fields, "recipient_ssn", ValueType::Ssn, findings);

    let compensation = amount(fields, "nonemployee_compensation");
    if let Some(compensation) = compensation {
        if compensation <= 0.0 {
            findings.error(format!(
                "nonemployee compensation {compensation:.2} must be positive"
            ));
        }
    }

    if let (Some(withheld), Some(compensation)) =
        (amount(fields, "federal_tax_withheld"), compensation)
    {
        if withheld > compensation {
            findings.error(format!(
                "federal withholding {withheld:.2} exceeds compensation {compensation:.2}"
            ));
        } else if compensation > 0.0 && withheld / compensation > WITHHOLDING_RATE_CEILING {
            findings.warning(format!(
                "withholding rate {:.1}% is unusually high",
                withheld / compensation * 100.0
            ));
        }
    }
}

pub(crate) fn form_1099_div(fields: &FieldMap, findings: &mut Findings) {
    check_identifier(fields, "recipient_ssn", ValueType::Ssn, findings);

    if let (Some(ordinary), Some(qualified)) = (
        amount(fields, "ordinary_dividends"),
        amount(fields, "qualified_dividends"),
    ) {
        if qualified > ordinary + DIVIDEND_TOLERANCE {
            findings.error(format!(
                "qualified dividends exceed ordinary dividends ({qualified:.2} > {ordinary:.2})"
            ));
        }
    }
}

pub(crate) fn paystub(fields: &FieldMap, findings: &mut Findings) {
    if let (Some(gross_current), Some(gross_ytd)) = (
        amount(fields, "gross_current"),
        amount(fields, "gross_ytd"),
    ) {
        if gross_ytd < gross_current {
            findings.warning(format!(
                "year-to-date gross {gross_ytd:.2} is below the current period gross {gross_current:.2}"
            ));
        }
    }
}
