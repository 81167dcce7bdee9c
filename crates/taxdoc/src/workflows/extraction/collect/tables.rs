use super::super::domain::{Candidate, DocumentType, SourceKind};
use super::super::schema::{normalize_label, FieldSchema};
use super::super::sources::TableBlock;
use super::TABLE_CONFIDENCE;

/// Map table cells into named fields using the document type's column
/// conventions. Paystubs carry Current/YTD amount columns; the IRS forms are
/// effectively label/value grids.
pub(crate) fn table_candidates(schema: &FieldSchema, blocks: &[TableBlock]) -> Vec<Candidate> {
    match schema.document_type {
        DocumentType::Paystub => paystub_candidates(schema, blocks),
        _ => label_value_candidates(schema, blocks),
    }
}

/// Paystub earnings tables: a row label plus amount columns headed
/// "Current" and "YTD".
const PAYSTUB_ROWS: &[(&str, &str, &str)] = &[
    ("gross pay", "gross_current", "gross_ytd"),
    ("net pay", "net_current", "net_ytd"),
    ("federal income tax", "federal_tax_current", "federal_tax_ytd"),
    ("fed tax", "federal_tax_current", "federal_tax_ytd"),
];

fn paystub_candidates(schema: &FieldSchema, blocks: &[TableBlock]) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for block in blocks {
        let Some(header) = block.rows.first() else {
            continue;
        };
        let current_column = column_containing(header, "current");
        let ytd_column = column_containing(header, "ytd");
        if current_column.is_none() && ytd_column.is_none() {
            continue;
        }

        for row in block.rows.iter().skip(1) {
            let Some(label) = row.first() else {
                continue;
            };
            let normalized = normalize_label(label);
            let Some((_, current_key, ytd_key)) = PAYSTUB_ROWS
                .iter()
                .find(|(row_label, _, _)| normalized.contains(row_label))
            else {
                continue;
            };

            for (column, key) in [(current_column, *current_key), (ytd_column, *ytd_key)] {
                let Some(index) = column else {
                    continue;
                };
                let Some(value) = row.get(index).map(|cell| cell.trim()) else {
                    continue;
                };
                if value.is_empty() || schema.field(key).is_none() {
                    continue;
                }
                candidates.push(
                    Candidate::new(key, value, TABLE_CONFIDENCE, SourceKind::Table)
                        .on_page(block.page),
                );
            }
        }
    }

    candidates
}

fn column_containing(header: &[String], needle: &str) -> Option<usize> {
    header
        .iter()
        .position(|cell| normalize_label(cell).contains(needle))
}

/// Generic two-column grids: the left cell names the box, the right holds the
/// value. Leading box numbers ("1 Wages, tips...") are stripped before the
/// alias lookup.
fn label_value_candidates(schema: &FieldSchema, blocks: &[TableBlock]) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for block in blocks {
        for row in &block.rows {
            let [label, value] = row.as_slice() else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let stripped = label
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ' ');
            let Some(spec) = schema
                .match_label(label)
                .or_else(|| schema.match_label(stripped))
            else {
                continue;
            };
            candidates.push(
                Candidate::new(
                    spec.key.clone(),
                    value,
                    TABLE_CONFIDENCE,
                    SourceKind::Table,
                )
                .on_page(block.page),
            );
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::extraction::schema::SchemaRegistry;

    fn rows(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn paystub_current_and_ytd_columns_map_to_distinct_fields() {
        let registry = SchemaRegistry::builtin().expect("schemas compile");
        let schema = registry.get(DocumentType::Paystub).expect("paystub schema");
        let block = TableBlock {
            rows: rows(&[
                &["Description", "Current", "YTD"],
                &["Gross Pay", "2,450.00", "31,850.00"],
                &["Net Pay", "1,894.12", "24,623.56"],
            ]),
            page: 1,
        };

        let candidates = table_candidates(schema, &[block]);
        let keys: Vec<&str> = candidates
            .iter()
            .map(|candidate| candidate.field_key.as_str())
            .collect();
        assert_eq!(
            keys,
            vec!["gross_current", "gross_ytd", "net_current", "net_ytd"]
        );
        assert!(candidates
            .iter()
            .all(|candidate| candidate.source == SourceKind::Table));
    }

    #[test]
    fn w2_grid_rows_strip_box_numbers() {
        let registry = SchemaRegistry::builtin().expect("schemas compile");
        let schema = registry.get(DocumentType::W2).expect("w2 schema");
        let block = TableBlock {
            rows: rows(&[
                &["1 Wages, tips, other compensation", "50000.00"],
                &["2 Federal income tax withheld", "6800.00"],
                &["unrelated", "ignored"],
            ]),
            page: 1,
        };

        let candidates = table_candidates(schema, &[block]);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].field_key, "wages_income");
        assert_eq!(candidates[1].field_key, "federal_tax_withheld");
    }
}
