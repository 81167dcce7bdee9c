use std::future::Future;

use serde::{Deserialize, Serialize};

use super::domain::{BoundingBox, DocumentType};

/// Failure of one extraction source. Always recovered locally: the failing
/// source contributes zero candidates and the pipeline continues.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("source timed out")]
    TimedOut,
    #[error("source returned malformed output: {0}")]
    Malformed(String),
}

/// Answer to one structured query, scored by the originating engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub query: String,
    pub answer: String,
    pub confidence: f32,
    #[serde(default = "default_page")]
    pub page: u32,
}

/// Key/value pair lifted from a form region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub label: String,
    pub value: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub geometry: Option<BoundingBox>,
}

/// Table region reconstructed by the structural engine. The first row is
/// treated as the header row when mapping columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    pub rows: Vec<Vec<String>>,
    #[serde(default = "default_page")]
    pub page: u32,
}

fn default_page() -> u32 {
    1
}

/// Per-source results from the structural extraction engine. Each slot is an
/// explicit outcome so a failed source is data, not control flow.
#[derive(Debug, Clone)]
pub struct SourceOutputs {
    pub queries: Result<Vec<QueryAnswer>, SourceError>,
    pub forms: Result<Vec<FormField>, SourceError>,
    pub tables: Result<Vec<TableBlock>, SourceError>,
}

impl SourceOutputs {
    pub fn empty() -> Self {
        Self {
            queries: Ok(Vec::new()),
            forms: Ok(Vec::new()),
            tables: Ok(Vec::new()),
        }
    }
}

impl Default for SourceOutputs {
    fn default() -> Self {
        Self::empty()
    }
}

/// Everything the pipeline needs to process one document.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub raw_text: String,
    pub sources: SourceOutputs,
}

impl DocumentInput {
    pub fn new(raw_text: impl Into<String>, sources: SourceOutputs) -> Self {
        Self {
            raw_text: raw_text.into(),
            sources,
        }
    }

    pub fn text_only(raw_text: impl Into<String>) -> Self {
        Self::new(raw_text, SourceOutputs::empty())
    }
}

/// Request sent to the Layer-2 extractor for the fields Layer 1 left weak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerTwoRequest {
    pub document_type: DocumentType,
    pub field_keys: Vec<String>,
    pub raw_text: String,
}

/// Completion text returned by the Layer-2 extractor. Expected to contain a
/// JSON object keyed by schema field keys; surrounding prose is tolerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerTwoCompletion {
    pub text: String,
}

/// Escalation tier two: an LLM asked to read the fields the deterministic
/// layer could not resolve confidently. Injected so tests and demos can
/// script it; the pipeline owns the timeout.
pub trait LayerTwoExtractor: Send + Sync {
    fn extract(
        &self,
        request: LayerTwoRequest,
    ) -> impl Future<Output = Result<LayerTwoCompletion, SourceError>> + Send;
}

/// Extractor that refuses every request. Used where Layer 2 is intentionally
/// disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLayerTwo;

impl LayerTwoExtractor for DisabledLayerTwo {
    async fn extract(
        &self,
        _request: LayerTwoRequest,
    ) -> Result<LayerTwoCompletion, SourceError> {
        Err(SourceError::Unavailable("layer two disabled".to_string()))
    }
}

/// Pull the first JSON object out of a completion and flatten its top-level
/// entries to strings. Nested values and nulls are dropped.
pub fn parse_completion_fields(completion: &str) -> Result<Vec<(String, String)>, SourceError> {
    let start = completion
        .find('{')
        .ok_or_else(|| SourceError::Malformed("no JSON object in completion".to_string()))?;
    let end = completion
        .rfind('}')
        .ok_or_else(|| SourceError::Malformed("unterminated JSON object".to_string()))?;
    if end < start {
        return Err(SourceError::Malformed(
            "unterminated JSON object".to_string(),
        ));
    }

    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&completion[start..=end])
            .map_err(|err| SourceError::Malformed(err.to_string()))?;

    let mut fields = Vec::with_capacity(object.len());
    for (key, value) in object {
        let text = match value {
            serde_json::Value::String(text) => text,
            serde_json::Value::Number(number) => number.to_string(),
            serde_json::Value::Bool(flag) => flag.to_string(),
            _ => continue,
        };
        if !text.trim().is_empty() {
            fields.push((key, text));
        }
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_parsing_tolerates_surrounding_prose() {
        let completion = r#"Here are the fields you asked for:
{"wages_income": "50000.00", "tax_year": 2023, "notes": null}
Let me know if you need anything else."#;

        let fields = parse_completion_fields(completion).expect("object parses");
        assert_eq!(
            fields,
            vec![
                ("tax_year".to_string(), "2023".to_string()),
                ("wages_income".to_string(), "50000.00".to_string()),
            ]
        );
    }

    #[test]
    fn completion_without_object_is_malformed() {
        let err = parse_completion_fields("I could not read the document").unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }
}
