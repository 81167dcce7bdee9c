use serde::{Deserialize, Serialize};

use super::domain::{DocumentType, ExtractionRecord};

/// Dollar slack allowed between summed W-2 wages and the 1040 wage line.
const WAGE_RECONCILIATION_TOLERANCE: f64 = 100.0;

/// Inconsistency found across a batch of records from the same filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossDocumentFinding {
    pub field_key: String,
    pub message: String,
}

/// Optional second pass over a set of extraction records. Single-document
/// validation never depends on this; it exists for callers holding a whole
/// filing at once.
pub fn reconcile(records: &[ExtractionRecord]) -> Vec<CrossDocumentFinding> {
    let mut findings = Vec::new();

    let w2_wages: Vec<f64> = records
        .iter()
        .filter(|record| record.document_type == DocumentType::W2)
        .filter_map(|record| record.amount("wages_income"))
        .collect();

    let return_wages = records
        .iter()
        .find(|record| record.document_type == DocumentType::Form1040)
        .and_then(|record| record.amount("wages_line"));

    if let (false, Some(reported)) = (w2_wages.is_empty(), return_wages) {
        let total: f64 = w2_wages.iter().sum();
        if (total - reported).abs() > WAGE_RECONCILIATION_TOLERANCE {
            findings.push(CrossDocumentFinding {
                field_key: "wages_line".to_string(),
                message: format!(
                    "W-2 wages total {total:.2} does not match the 1040 wage line {reported:.2}"
                ),
            });
        }
    }

    findings
}
