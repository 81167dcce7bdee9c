use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use taxdoc::config::EngineConfig;
use taxdoc::workflows::extraction::{
    ExtractionPipeline, InMemoryCache, LayerTwoCompletion, LayerTwoExtractor, LayerTwoRequest,
    SchemaRegistry, SourceError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stand-in for a live model endpoint: reports itself unavailable so the
/// pipeline falls through to the deterministic tiers. Deployments wire a real
/// extractor here.
pub(crate) struct OfflineLayerTwo;

impl LayerTwoExtractor for OfflineLayerTwo {
    async fn extract(
        &self,
        _request: LayerTwoRequest,
    ) -> Result<LayerTwoCompletion, SourceError> {
        Err(SourceError::Unavailable(
            "no layer-two model configured".to_string(),
        ))
    }
}

pub(crate) type ServicePipeline = ExtractionPipeline<OfflineLayerTwo, InMemoryCache, InMemoryCache>;

pub(crate) fn build_pipeline(engine: EngineConfig) -> Result<ServicePipeline, taxdoc::error::AppError> {
    let schemas = Arc::new(SchemaRegistry::builtin()?);
    Ok(ExtractionPipeline::new(
        schemas,
        Arc::new(OfflineLayerTwo),
        Arc::new(InMemoryCache::default()),
        Arc::new(InMemoryCache::default()),
        engine,
    ))
}
