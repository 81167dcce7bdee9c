use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::cache::{ClassificationCache, ResultCache};
use super::domain::{DocumentType, ExtractionRecord};
use super::pipeline::{ExtractionError, ExtractionPipeline};
use super::sources::{
    DocumentInput, FormField, LayerTwoExtractor, QueryAnswer, SourceOutputs, TableBlock,
};

/// Inbound payload for one document: the raw text plus whatever structured
/// blocks the upstream engines produced.
#[derive(Debug, Deserialize)]
pub struct ExtractionRequest {
    pub raw_text: String,
    #[serde(default)]
    pub query_answers: Vec<QueryAnswer>,
    #[serde(default)]
    pub form_fields: Vec<FormField>,
    #[serde(default)]
    pub tables: Vec<TableBlock>,
}

impl ExtractionRequest {
    fn into_input(self) -> DocumentInput {
        DocumentInput::new(
            self.raw_text,
            SourceOutputs {
                queries: Ok(self.query_answers),
                forms: Ok(self.form_fields),
                tables: Ok(self.tables),
            },
        )
    }
}

/// API view of a finished extraction: the audited record, the masked export
/// map, and the observability block.
#[derive(Debug, Serialize)]
pub struct ExtractionResponse {
    pub document_type: DocumentType,
    pub classification_confidence: f32,
    pub record: ExtractionRecord,
    pub masked_fields: BTreeMap<String, serde_json::Value>,
    pub layers_used: Vec<&'static str>,
    pub needs_review: bool,
    pub from_cache: bool,
}

/// Router builder exposing the extraction pipeline over HTTP.
pub fn extraction_router<L, C, R>(pipeline: Arc<ExtractionPipeline<L, C, R>>) -> Router
where
    L: LayerTwoExtractor + 'static,
    C: ClassificationCache + 'static,
    R: ResultCache + 'static,
{
    Router::new()
        .route(
            "/api/v1/documents/extract",
            post(extract_handler::<L, C, R>),
        )
        .with_state(pipeline)
}

pub(crate) async fn extract_handler<L, C, R>(
    State(pipeline): State<Arc<ExtractionPipeline<L, C, R>>>,
    axum::Json(request): axum::Json<ExtractionRequest>,
) -> Response
where
    L: LayerTwoExtractor + 'static,
    C: ClassificationCache + 'static,
    R: ResultCache + 'static,
{
    match pipeline.process(request.into_input()).await {
        Ok(outcome) => {
            let layers_used = outcome
                .record
                .layers_used
                .iter()
                .map(|layer| layer.label())
                .collect();
            let response = ExtractionResponse {
                document_type: outcome.record.document_type,
                classification_confidence: outcome.record.classification_confidence,
                needs_review: outcome.needs_review(),
                layers_used,
                masked_fields: outcome.masked_fields,
                from_cache: outcome.from_cache,
                record: outcome.record,
            };
            (StatusCode::OK, axum::Json(response)).into_response()
        }
        Err(error @ ExtractionError::UnsupportedDocument { .. }) => {
            let payload = json!({
                "error": error.to_string(),
                "document_type": DocumentType::Other.label(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(error @ ExtractionError::MissingSchema { .. }) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
