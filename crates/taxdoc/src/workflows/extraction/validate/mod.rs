mod rules;

use std::collections::BTreeMap;

use super::domain::{DocumentType, ResolvedField, ValidationResult, ValidationStatus};

/// Warnings beyond this count flag the record for human review even when no
/// rule failed outright.
const WARNING_REVIEW_THRESHOLD: usize = 2;

/// Collector for rule findings. Rules append; the engine derives status and
/// the review flag at the end.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Findings {
    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub(crate) fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Apply the document type's arithmetic and cross-field consistency rules.
///
/// Stateless; recomputed from scratch on every call. Validation always sees
/// raw magnitudes; masking happens strictly after this pass.
pub fn validate(
    document_type: DocumentType,
    resolved_fields: &BTreeMap<String, ResolvedField>,
) -> ValidationResult {
    let mut findings = Findings::default();

    match document_type {
        DocumentType::W2 => rules::w2(resolved_fields, &mut findings),
        DocumentType::Form1040 => rules::form_1040(resolved_fields, &mut findings),
        DocumentType::Form1099Nec => rules::form_1099_nec(resolved_fields, &mut findings),
        DocumentType::Form1099Div => rules::form_1099_div(resolved_fields, &mut findings),
        DocumentType::Paystub => rules::paystub(resolved_fields, &mut findings),
        DocumentType::Other => {}
    }

    let Findings { errors, warnings } = findings;
    let status = if errors.is_empty() {
        ValidationStatus::Passed
    } else {
        ValidationStatus::Failed
    };
    let needs_review = !errors.is_empty() || warnings.len() > WARNING_REVIEW_THRESHOLD;

    ValidationResult {
        status,
        errors,
        warnings,
        needs_review,
    }
}
