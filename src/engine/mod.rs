// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Render orchestration: the live preview controller and the batch
//! exporter, plus the session context both are built from.

pub mod batch;
pub mod preview;

#[cfg(test)]
mod integration_tests;

pub use batch::{BatchExporter, BatchReport, FileOutcome};
pub use preview::PreviewController;

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backends::BackendRegistry;
use crate::cache::{cache_key, themed_cache_key, RenderCache};
use crate::classify::Classifier;
use crate::errors::RenderError;
use crate::observability::messages::engine::CacheHit;
use crate::observability::messages::StructuredLog;
use crate::render::{
    is_theme_aware, ClassificationResult, DiagramSource, RenderRequest, RenderResult, Theme,
};

/// Everything one preview/export session holds: the resolved
/// configuration, the backend registry built from it, and the render
/// cache they share.
///
/// The context is constructor-injected into the controller and the
/// exporter; there is no implicit global instance. Reconfiguration means
/// building a *new* context (new registry, empty cache) and dropping the
/// old one; live instances are never mutated.
pub struct SessionContext {
    pub config: Arc<crate::config::Configuration>,
    pub registry: Arc<BackendRegistry>,
    pub cache: Arc<Mutex<RenderCache>>,
}

impl SessionContext {
    pub fn new(config: Arc<crate::config::Configuration>) -> Self {
        let registry = Arc::new(BackendRegistry::from_config(&config));
        Self::with_registry(config, registry)
    }

    /// Build a context around an explicit registry (the injection seam
    /// used by tests and by embedders with custom backends).
    pub fn with_registry(
        config: Arc<crate::config::Configuration>,
        registry: Arc<BackendRegistry>,
    ) -> Self {
        let cache = Arc::new(Mutex::new(RenderCache::new(config.cache_capacity)));
        Self {
            config,
            registry,
            cache,
        }
    }
}

/// The one render pass both consumers share: classify, consult the
/// cache, dispatch to the registry on a miss (sanitization happens
/// inside dispatch), store the settled result.
///
/// Classification failures surface as the error arm like any other
/// failure; the cache itself refuses to store errors.
pub(crate) async fn render_source(
    classifier: &Classifier,
    registry: &BackendRegistry,
    cache: &Mutex<RenderCache>,
    source: &DiagramSource,
    theme: Theme,
    override_classification: Option<ClassificationResult>,
) -> RenderResult {
    let classification = override_classification.or_else(|| classifier.classify(source));
    let (backend, diagram_type) = match classification {
        Some(ClassificationResult {
            backend,
            diagram_type: Some(diagram_type),
        }) => (backend, diagram_type),
        _ => return RenderError::ClassificationAmbiguous.into_result(),
    };

    let key = if is_theme_aware(backend, diagram_type) {
        themed_cache_key(&source.path, &source.text, theme)
    } else {
        cache_key(&source.path, &source.text)
    };

    if let Some(hit) = cache.lock().await.get(&key) {
        CacheHit { key: &key }.log();
        return hit;
    }

    let request = RenderRequest {
        content: source.text.clone(),
        diagram_type,
        theme,
        cache_key: key.clone(),
    };
    let result = registry.dispatch(backend, &request).await;
    cache.lock().await.set(key, result.clone());
    result
}
