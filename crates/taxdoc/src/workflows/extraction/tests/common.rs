use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::workflows::extraction::cache::NoopCache;
use crate::workflows::extraction::domain::{ResolvedField, SourceKind};
use crate::workflows::extraction::pipeline::ExtractionPipeline;
use crate::workflows::extraction::schema::SchemaRegistry;
use crate::workflows::extraction::sources::{
    LayerTwoCompletion, LayerTwoExtractor, LayerTwoRequest, QueryAnswer, SourceError,
};

/// W-2 text with both classification keywords and regex-extractable values.
pub(super) fn w2_text_full() -> &'static str {
    "Form W-2 Wage and Tax Statement 2023\n\
     Employer identification number 12-3456789\n\
     Employee's social security number 123-45-6789\n\
     1 Wages, tips, other compensation 50000.00\n\
     2 Federal income tax withheld 6800.00\n\
     3 Social security wages 50000.00\n\
     4 Social security tax withheld 3100.00\n\
     5 Medicare wages and tips 50000.00\n\
     6 Medicare tax withheld 725.00\n"
}

/// W-2 text that classifies cleanly but carries no machine-readable values,
/// so every field depends on the structured sources.
pub(super) fn w2_text_blurry() -> &'static str {
    "Form W-2 Wage and Tax Statement\n\
     The employer identification number region is illegible\n\
     social security wages and medicare wages are present but smudged\n"
}

pub(super) fn query(query: &str, answer: &str, confidence: f32) -> QueryAnswer {
    QueryAnswer {
        query: query.to_string(),
        answer: answer.to_string(),
        confidence,
        page: 1,
    }
}

pub(super) fn resolved_field(key: &str, value: &str) -> ResolvedField {
    ResolvedField {
        field_key: key.to_string(),
        value: value.to_string(),
        confidence: 0.9,
        source: SourceKind::Query,
        cross_validated: false,
    }
}

pub(super) fn field_map(entries: &[(&str, &str)]) -> BTreeMap<String, ResolvedField> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), resolved_field(key, value)))
        .collect()
}

pub(super) fn pipeline<L>(layer_two: L) -> ExtractionPipeline<L, NoopCache, NoopCache>
where
    L: LayerTwoExtractor + 'static,
{
    pipeline_with_config(layer_two, EngineConfig::default())
}

pub(super) fn pipeline_with_config<L>(
    layer_two: L,
    config: EngineConfig,
) -> ExtractionPipeline<L, NoopCache, NoopCache>
where
    L: LayerTwoExtractor + 'static,
{
    ExtractionPipeline::new(
        Arc::new(SchemaRegistry::builtin().expect("builtin schemas compile")),
        Arc::new(layer_two),
        Arc::new(NoopCache),
        Arc::new(NoopCache),
        config,
    )
}

/// Layer-2 stand-in returning a canned completion and counting invocations.
pub(super) struct ScriptedLayerTwo {
    completion: String,
    calls: AtomicUsize,
}

impl ScriptedLayerTwo {
    pub(super) fn new(completion: impl Into<String>) -> Self {
        Self {
            completion: completion.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl LayerTwoExtractor for ScriptedLayerTwo {
    async fn extract(
        &self,
        _request: LayerTwoRequest,
    ) -> Result<LayerTwoCompletion, SourceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(LayerTwoCompletion {
            text: self.completion.clone(),
        })
    }
}

/// Layer-2 stand-in that always reports an outage.
pub(super) struct FailingLayerTwo;

impl LayerTwoExtractor for FailingLayerTwo {
    async fn extract(
        &self,
        _request: LayerTwoRequest,
    ) -> Result<LayerTwoCompletion, SourceError> {
        Err(SourceError::Unavailable("scripted outage".to_string()))
    }
}

/// Layer-2 stand-in that never answers within any realistic budget.
pub(super) struct SlowLayerTwo;

impl LayerTwoExtractor for SlowLayerTwo {
    async fn extract(
        &self,
        _request: LayerTwoRequest,
    ) -> Result<LayerTwoCompletion, SourceError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(LayerTwoCompletion {
            text: "{}".to_string(),
        })
    }
}
