use std::time::Duration;

use super::common::*;
use crate::config::EngineConfig;
use crate::workflows::extraction::domain::{DocumentType, ExtractionLayer, SourceKind};
use crate::workflows::extraction::pipeline::ExtractionError;
use crate::workflows::extraction::sources::{DocumentInput, SourceError, SourceOutputs};

#[tokio::test]
async fn clean_w2_resolves_without_touching_layer_two() {
    let extractor = ScriptedLayerTwo::new(r#"{"wages_income": "99999.00"}"#);
    let pipeline = pipeline(extractor);

    let sources = SourceOutputs {
        queries: Ok(vec![
            query(
                "What are the wages, tips, and other compensation?",
                "50000.00",
                0.93,
            ),
            query("How much federal income tax was withheld?", "6800.00", 0.91),
        ]),
        forms: Ok(Vec::new()),
        tables: Ok(Vec::new()),
    };

    let outcome = pipeline
        .process(DocumentInput::new(w2_text_full(), sources))
        .await
        .expect("clean w2 extracts");

    let record = &outcome.record;
    assert_eq!(record.document_type, DocumentType::W2);
    assert_eq!(
        record.field("wages_income").map(|f| f.value.as_str()),
        Some("50000.00")
    );
    assert_eq!(
        record.field("wages_income").map(|f| f.source),
        Some(SourceKind::Query)
    );
    assert_eq!(
        record.field("federal_tax_withheld").map(|f| f.source),
        Some(SourceKind::Query)
    );
    assert!(!record.layers_used.contains(&ExtractionLayer::Llm));
    assert!(!record.validation.needs_review);
    assert_eq!(pipeline.layer_two().calls(), 0);
}

#[tokio::test]
async fn weak_field_escalates_and_cross_validates() {
    let extractor = ScriptedLayerTwo::new(
        r#"{"social_security_tax": "3100.00", "social_security_wages": "50000.00"}"#,
    );
    let pipeline = pipeline(extractor);

    let sources = SourceOutputs {
        queries: Ok(vec![query(
            "How much social security tax was withheld?",
            "3100.00",
            0.40,
        )]),
        forms: Ok(Vec::new()),
        tables: Ok(Vec::new()),
    };

    let outcome = pipeline
        .process(DocumentInput::new(w2_text_blurry(), sources))
        .await
        .expect("blurry w2 still extracts");

    let record = &outcome.record;
    assert_eq!(pipeline.layer_two().calls(), 1);
    assert!(record.layers_used.contains(&ExtractionLayer::Llm));

    let ss_tax = record.field("social_security_tax").expect("resolved");
    assert!(ss_tax.cross_validated);
    assert_eq!(ss_tax.source, SourceKind::Query);
    assert!((ss_tax.confidence - 0.85).abs() < 1e-4);

    let ss_wages = record.field("social_security_wages").expect("filled by llm");
    assert_eq!(ss_wages.source, SourceKind::Llm);
    assert!(record.conflicts.is_empty());
    assert!(!record.validation.needs_review);
}

#[tokio::test]
async fn layer_two_disagreement_is_kept_for_audit() {
    let extractor = ScriptedLayerTwo::new(r#"{"social_security_tax": "9999.00"}"#);
    let pipeline = pipeline(extractor);

    let sources = SourceOutputs {
        queries: Ok(vec![query(
            "How much social security tax was withheld?",
            "3100.00",
            0.40,
        )]),
        forms: Ok(Vec::new()),
        tables: Ok(Vec::new()),
    };

    let outcome = pipeline
        .process(DocumentInput::new(w2_text_blurry(), sources))
        .await
        .expect("extracts despite disagreement");

    let record = &outcome.record;
    let ss_tax = record.field("social_security_tax").expect("layer 1 retained");
    assert_eq!(ss_tax.value, "3100.00");
    assert!(!ss_tax.cross_validated);

    assert_eq!(record.conflicts.len(), 1);
    let conflict = &record.conflicts[0];
    assert_eq!(conflict.field_key, "social_security_tax");
    assert_eq!(conflict.retained.value, "3100.00");
    assert_eq!(conflict.challenger.value, "9999.00");
    assert_eq!(conflict.challenger.source, SourceKind::Llm);
    assert!(record.validation.needs_review);
}

#[tokio::test]
async fn regex_safety_net_runs_for_unresolved_critical_fields() {
    let pipeline = pipeline(FailingLayerTwo);

    // Identifiers live in the raw text; nothing structured survived, and the
    // wage boxes stay unresolved so the safety net tier is reached.
    let text = "Form W-2 Wage and Tax Statement\n\
                Employer identification number 98-7654321\n\
                Employee's social security number 321-54-9876\n\
                social security wages and medicare wages smudged\n";

    let outcome = pipeline
        .process(DocumentInput::text_only(text))
        .await
        .expect("extracts with the safety net");

    let record = &outcome.record;
    assert!(record.layers_used.contains(&ExtractionLayer::RegexFallback));
    assert_eq!(
        record.field("employee_ssn").map(|f| f.value.as_str()),
        Some("321-54-9876")
    );
    assert_eq!(
        record.field("employer_ein").map(|f| f.value.as_str()),
        Some("98-7654321")
    );
}

#[tokio::test(start_paused = true)]
async fn layer_two_timeout_yields_zero_candidates() {
    let config = EngineConfig {
        layer_two_timeout: Duration::from_millis(50),
        ..EngineConfig::default()
    };
    let pipeline = pipeline_with_config(SlowLayerTwo, config);

    let sources = SourceOutputs {
        queries: Ok(vec![query(
            "How much social security tax was withheld?",
            "3100.00",
            0.40,
        )]),
        forms: Ok(Vec::new()),
        tables: Ok(Vec::new()),
    };

    let outcome = pipeline
        .process(DocumentInput::new(w2_text_blurry(), sources))
        .await
        .expect("timeout never aborts the document");

    let record = &outcome.record;
    assert!(record.layers_used.contains(&ExtractionLayer::Llm));
    let ss_tax = record.field("social_security_tax").expect("layer 1 value kept");
    assert!(!ss_tax.cross_validated);
    assert!(record
        .resolved_fields
        .values()
        .all(|field| field.source != SourceKind::Llm));
}

#[tokio::test]
async fn table_source_outage_never_blocks_other_sources() {
    let extractor = ScriptedLayerTwo::new("{}");
    let pipeline = pipeline(extractor);

    let sources = SourceOutputs {
        queries: Ok(vec![
            query(
                "What are the wages, tips, and other compensation?",
                "50000.00",
                0.93,
            ),
            query("How much federal income tax was withheld?", "6800.00", 0.91),
        ]),
        forms: Ok(Vec::new()),
        tables: Err(SourceError::Unavailable("table engine offline".to_string())),
    };

    let outcome = pipeline
        .process(DocumentInput::new(w2_text_full(), sources))
        .await
        .expect("pipeline survives a source outage");

    assert_eq!(outcome.source_failures.len(), 1);
    assert_eq!(outcome.source_failures[0].0, SourceKind::Table);
    assert_eq!(
        outcome.record.field("wages_income").map(|f| f.value.as_str()),
        Some("50000.00")
    );
}

#[tokio::test]
async fn unclassifiable_document_is_rejected_before_extraction() {
    let extractor = ScriptedLayerTwo::new("{}");
    let pipeline = pipeline(extractor);

    let result = pipeline
        .process(DocumentInput::text_only(
            "meeting notes from tuesday\nagenda item one\n",
        ))
        .await;

    match result {
        Err(ExtractionError::UnsupportedDocument { confidence }) => {
            assert!(confidence < 0.3);
        }
        other => panic!("expected typed rejection, got {other:?}"),
    }
    assert_eq!(pipeline.layer_two().calls(), 0);
}

#[tokio::test]
async fn discovery_mode_collects_bounded_unknown_fields() {
    let extractor = ScriptedLayerTwo::new("{}");
    let pipeline = pipeline(extractor);

    let input = DocumentInput::text_only(
        "case number: 42-AB\nreviewer: jordan\nstatus: approved\n",
    );
    let discovered = pipeline.discover_unknown(&input);

    assert_eq!(discovered.len(), 3);
    assert!(discovered.contains_key("case_number"));
    assert!(discovered.contains_key("reviewer"));
    assert!(discovered.contains_key("status"));
}
