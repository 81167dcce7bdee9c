use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::thread;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;

use super::cache::{CacheKey, ClassificationCache, ResultCache};
use super::classify::DocumentClassifier;
use super::collect::{self, CollectedCandidates};
use super::crossdoc::{self, CrossDocumentFinding};
use super::domain::{
    Candidate, DocumentType, ExtractionLayer, ExtractionRecord, FieldConflict, ResolvedField,
    SourceKind,
};
use super::masking::masked_field_map;
use super::resolve::resolve;
use super::schema::{FieldSchema, SchemaRegistry};
use super::sources::{
    parse_completion_fields, DocumentInput, LayerTwoExtractor, LayerTwoRequest, SourceError,
};
use super::validate::validate;

/// Confidence boost granted when Layer 2 independently agrees with Layer 1.
const CROSS_VALIDATION_BOOST: f32 = 0.1;
const CROSS_VALIDATION_CAP: f32 = 0.95;

/// Relative tolerance under which two numeric observations count as the same
/// reading.
const NUMERIC_AGREEMENT_TOLERANCE: f64 = 0.05;

/// Field counts below this resolve sequentially; the fan-out is not worth the
/// thread setup.
const PARALLEL_RESOLVE_THRESHOLD: usize = 4;

/// Progression of one document through the escalation tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineStage {
    Classified,
    LayerOneDone,
    LayerTwoDone,
    LayerThreeDone,
    Validated,
    Finalized,
}

impl PipelineStage {
    const fn label(self) -> &'static str {
        match self {
            PipelineStage::Classified => "classified",
            PipelineStage::LayerOneDone => "layer1_done",
            PipelineStage::LayerTwoDone => "layer2_done",
            PipelineStage::LayerThreeDone => "layer3_done",
            PipelineStage::Validated => "validated",
            PipelineStage::Finalized => "finalized",
        }
    }
}

/// Typed rejection surfaced to the caller before extraction is attempted.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("unsupported document type (best keyword overlap {confidence:.2})")]
    UnsupportedDocument { confidence: f32 },
    #[error("no field schema registered for document type '{}'", document_type.label())]
    MissingSchema { document_type: DocumentType },
}

/// Everything a pipeline invocation hands back to its caller.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub record: ExtractionRecord,
    pub masked_fields: BTreeMap<String, Value>,
    pub source_failures: Vec<(SourceKind, SourceError)>,
    pub from_cache: bool,
}

impl ExtractionOutcome {
    pub fn needs_review(&self) -> bool {
        self.record.validation.needs_review
    }
}

/// Orchestrates classification, the three extraction tiers, validation, and
/// masking for one document at a time. Stateless across documents; the two
/// injected caches are the only shared structures.
pub struct ExtractionPipeline<L, C, R> {
    classifier: DocumentClassifier,
    schemas: Arc<SchemaRegistry>,
    layer_two: Arc<L>,
    classification_cache: Arc<C>,
    result_cache: Arc<R>,
    config: EngineConfig,
}

impl<L, C, R> ExtractionPipeline<L, C, R>
where
    L: LayerTwoExtractor + 'static,
    C: ClassificationCache + 'static,
    R: ResultCache + 'static,
{
    pub fn new(
        schemas: Arc<SchemaRegistry>,
        layer_two: Arc<L>,
        classification_cache: Arc<C>,
        result_cache: Arc<R>,
        config: EngineConfig,
    ) -> Self {
        Self {
            classifier: DocumentClassifier::new(),
            schemas,
            layer_two,
            classification_cache,
            result_cache,
            config,
        }
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn layer_two(&self) -> &L {
        &self.layer_two
    }

    /// Run one document through the full pipeline.
    pub async fn process(&self, input: DocumentInput) -> Result<ExtractionOutcome, ExtractionError> {
        let content_key = CacheKey::content(&input.raw_text);
        if let Some(record) = self.result_cache.get(&content_key) {
            debug!(document_type = record.document_type.label(), "result served from content cache");
            let schema = self.schemas.get(record.document_type);
            let masked_fields = masked_field_map(&record, schema);
            return Ok(ExtractionOutcome {
                record,
                masked_fields,
                source_failures: Vec::new(),
                from_cache: true,
            });
        }

        let classification = self
            .classifier
            .classify_cached(self.classification_cache.as_ref(), &input.raw_text);
        self.trace_stage(PipelineStage::Classified);

        if classification.document_type == DocumentType::Other {
            info!(
                confidence = classification.confidence,
                "document rejected below classification floor"
            );
            return Err(ExtractionError::UnsupportedDocument {
                confidence: classification.confidence,
            });
        }

        let schema = self.schemas.get(classification.document_type).ok_or(
            ExtractionError::MissingSchema {
                document_type: classification.document_type,
            },
        )?;

        // Layer 1: every deterministic source, every schema field.
        let collected = collect::collect(&input.sources, &input.raw_text, schema);
        let mut resolved = resolve_fields(schema, &collected);
        let mut layers_used = BTreeSet::from([ExtractionLayer::Deterministic]);
        let mut conflicts: Vec<FieldConflict> = Vec::new();
        self.trace_stage(PipelineStage::LayerOneDone);

        if !self.acceptance_met(schema, &resolved) {
            let escalation_targets = self.escalation_targets(schema, &resolved);
            if !escalation_targets.is_empty() {
                layers_used.insert(ExtractionLayer::Llm);
                let candidates = self
                    .run_layer_two(&input.raw_text, schema, &escalation_targets)
                    .await;
                self.merge_layer_two(schema, candidates, &mut resolved, &mut conflicts);
                self.trace_stage(PipelineStage::LayerTwoDone);
            }

            let critical_missing: Vec<String> = schema
                .critical_fields()
                .iter()
                .filter(|key| !resolved.contains_key(*key))
                .cloned()
                .collect();
            if !critical_missing.is_empty() {
                layers_used.insert(ExtractionLayer::RegexFallback);
                for candidate in
                    collect::regex_candidates(&input.raw_text, schema, Some(&critical_missing))
                {
                    let Some(value_type) = schema.value_type(&candidate.field_key) else {
                        continue;
                    };
                    if let Some(field) =
                        resolve(&candidate.field_key, value_type, std::slice::from_ref(&candidate))
                    {
                        resolved.insert(field.field_key.clone(), field);
                    }
                }
                self.trace_stage(PipelineStage::LayerThreeDone);
            }
        } else {
            debug!("coverage acceptance met after layer 1; escalation skipped");
        }

        let mut validation = validate(classification.document_type, &resolved);
        if !conflicts.is_empty() {
            validation.needs_review = true;
        }
        self.trace_stage(PipelineStage::Validated);

        let record = ExtractionRecord {
            document_type: classification.document_type,
            classification_confidence: classification.confidence,
            resolved_fields: resolved,
            validation,
            layers_used,
            conflicts,
        };
        self.result_cache.put(content_key, record.clone());

        let masked_fields = masked_field_map(&record, Some(schema));
        self.trace_stage(PipelineStage::Finalized);
        info!(
            document_type = record.document_type.label(),
            fields = record.resolved_fields.len(),
            needs_review = record.validation.needs_review,
            "document extraction finished"
        );

        Ok(ExtractionOutcome {
            record,
            masked_fields,
            source_failures: collected.source_failures,
            from_cache: false,
        })
    }

    /// Bounded discovery for documents the classifier cannot place: collect
    /// alias-keyed observations without any schema. The caller gets raw
    /// candidates, never a validated record.
    pub fn discover_unknown(&self, input: &DocumentInput) -> BTreeMap<String, Vec<Candidate>> {
        collect::discover(&input.sources, &input.raw_text)
    }

    /// Optional second pass over a set of finished records from one filing.
    pub fn reconcile_batch(&self, records: &[ExtractionRecord]) -> Vec<CrossDocumentFinding> {
        crossdoc::reconcile(records)
    }

    /// Coverage-based early exit: enough core fields plus every identity
    /// field means the paid tiers are skipped even if individual confidences
    /// are low.
    fn acceptance_met(
        &self,
        schema: &FieldSchema,
        resolved: &BTreeMap<String, ResolvedField>,
    ) -> bool {
        let policy = schema.acceptance();
        let core_count = policy
            .core_fields
            .iter()
            .filter(|key| resolved.contains_key(*key))
            .count();
        let identity_met = policy
            .identity_fields
            .iter()
            .all(|key| resolved.contains_key(key));
        core_count >= policy.minimum_core_fields && identity_met
    }

    /// Fields that justify the Layer-2 spend: required but unresolved, or
    /// resolved below the escalation threshold. Never a field already
    /// confidently resolved.
    fn escalation_targets(
        &self,
        schema: &FieldSchema,
        resolved: &BTreeMap<String, ResolvedField>,
    ) -> Vec<String> {
        schema
            .fields()
            .iter()
            .filter(|spec| match resolved.get(&spec.key) {
                Some(field) => field.confidence < self.config.escalation_threshold,
                None => spec.required,
            })
            .map(|spec| spec.key.clone())
            .collect()
    }

    async fn run_layer_two(
        &self,
        raw_text: &str,
        schema: &FieldSchema,
        field_keys: &[String],
    ) -> Vec<Candidate> {
        let request = LayerTwoRequest {
            document_type: schema.document_type,
            field_keys: field_keys.to_vec(),
            raw_text: raw_text.to_string(),
        };

        let completion =
            match tokio::time::timeout(self.config.layer_two_timeout, self.layer_two.extract(request))
                .await
            {
                Ok(Ok(completion)) => completion,
                Ok(Err(error)) => {
                    warn!(%error, "layer two extractor failed; continuing without it");
                    return Vec::new();
                }
                Err(_) => {
                    warn!("layer two extractor timed out; continuing without it");
                    return Vec::new();
                }
            };

        let fields = match parse_completion_fields(&completion.text) {
            Ok(fields) => fields,
            Err(error) => {
                warn!(%error, "layer two completion unusable");
                return Vec::new();
            }
        };

        fields
            .into_iter()
            .filter(|(key, _)| field_keys.contains(key))
            .map(|(key, value)| {
                Candidate::new(key, value, self.config.layer_two_confidence, SourceKind::Llm)
            })
            .collect()
    }

    /// Fold Layer-2 candidates into the resolved set. Agreement with an
    /// existing resolution earns a capped confidence boost; disagreement is
    /// kept as a conflict for audit, with the Layer-1 value retained.
    fn merge_layer_two(
        &self,
        schema: &FieldSchema,
        candidates: Vec<Candidate>,
        resolved: &mut BTreeMap<String, ResolvedField>,
        conflicts: &mut Vec<FieldConflict>,
    ) {
        for candidate in candidates {
            let Some(value_type) = schema.value_type(&candidate.field_key) else {
                continue;
            };

            match resolved.get(&candidate.field_key) {
                Some(existing) => {
                    // A Layer-2 value that fails normalization is unusable,
                    // not a disagreement.
                    let Some(challenger) =
                        super::normalize::normalize(value_type, &candidate.value)
                    else {
                        continue;
                    };
                    if values_agree(&existing.value, &challenger) {
                        let boosted = ResolvedField {
                            confidence: (existing.confidence + CROSS_VALIDATION_BOOST)
                                .min(CROSS_VALIDATION_CAP),
                            cross_validated: true,
                            ..existing.clone()
                        };
                        resolved.insert(boosted.field_key.clone(), boosted);
                    } else {
                        debug!(
                            field = %candidate.field_key,
                            "layer two disagrees with layer one; keeping both for audit"
                        );
                        conflicts.push(FieldConflict {
                            field_key: candidate.field_key.clone(),
                            retained: existing.clone(),
                            challenger: candidate,
                        });
                    }
                }
                None => {
                    if let Some(field) =
                        resolve(&candidate.field_key, value_type, std::slice::from_ref(&candidate))
                    {
                        resolved.insert(field.field_key.clone(), field);
                    }
                }
            }
        }
    }

    fn trace_stage(&self, stage: PipelineStage) {
        debug!(stage = stage.label(), "pipeline stage reached");
    }
}

/// Exact text match, or numeric readings within relative tolerance.
fn values_agree(left: &str, right: &str) -> bool {
    if left == right {
        return true;
    }
    let (Ok(a), Ok(b)) = (left.parse::<f64>(), right.parse::<f64>()) else {
        return false;
    };
    let magnitude = a.abs().max(b.abs());
    if magnitude == 0.0 {
        return true;
    }
    (a - b).abs() / magnitude <= NUMERIC_AGREEMENT_TOLERANCE
}

/// Resolve every schema field from its candidate list. Each `resolve` call is
/// pure and independent, so wide documents fan out across scoped threads.
fn resolve_fields(
    schema: &FieldSchema,
    collected: &CollectedCandidates,
) -> BTreeMap<String, ResolvedField> {
    let work: Vec<_> = schema
        .fields()
        .iter()
        .filter(|spec| !collected.candidates(&spec.key).is_empty())
        .collect();

    let resolved: Vec<Option<ResolvedField>> = if work.len() < PARALLEL_RESOLVE_THRESHOLD {
        work.iter()
            .map(|spec| resolve(&spec.key, spec.value_type, collected.candidates(&spec.key)))
            .collect()
    } else {
        thread::scope(|scope| {
            let handles: Vec<_> = work
                .iter()
                .map(|spec| {
                    scope.spawn(move || {
                        resolve(&spec.key, spec.value_type, collected.candidates(&spec.key))
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("field resolver panicked"))
                .collect()
        })
    };

    resolved
        .into_iter()
        .flatten()
        .map(|field| (field.field_key.clone(), field))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_agreement_uses_relative_tolerance() {
        assert!(values_agree("50000.00", "50000.00"));
        assert!(values_agree("50000.00", "51000.00"));
        assert!(!values_agree("50000.00", "60000.00"));
        assert!(!values_agree("abc", "def"));
    }
}
