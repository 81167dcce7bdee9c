//! Tax-document field extraction: candidate collection, resolution,
//! escalation, validation, and masking for one document at a time.

pub mod cache;
pub mod classify;
pub mod collect;
pub mod crossdoc;
pub mod domain;
pub mod masking;
pub mod normalize;
pub mod pipeline;
pub mod resolve;
pub mod router;
pub mod schema;
pub mod sources;
pub mod validate;

#[cfg(test)]
mod tests;

pub use cache::{CacheKey, ClassificationCache, InMemoryCache, NoopCache, ResultCache};
pub use classify::{Classification, DocumentClassifier};
pub use crossdoc::CrossDocumentFinding;
pub use domain::{
    BoundingBox, Candidate, DocumentType, ExtractionLayer, ExtractionRecord, FieldConflict,
    ResolvedField, SourceKind, ValidationResult, ValidationStatus, ValueType,
};
pub use pipeline::{ExtractionError, ExtractionOutcome, ExtractionPipeline};
pub use router::{extraction_router, ExtractionRequest, ExtractionResponse};
pub use schema::{FieldSchema, FieldSpec, SchemaError, SchemaRegistry};
pub use sources::{
    DisabledLayerTwo, DocumentInput, FormField, LayerTwoCompletion, LayerTwoExtractor,
    LayerTwoRequest, QueryAnswer, SourceError, SourceOutputs, TableBlock,
};
pub use validate::validate;
