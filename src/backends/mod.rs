// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Render backends and the registry that fronts them.
//!
//! Three execution strategies hide behind the one `DiagramBackend`
//! contract:
//!
//! * **Local process**: a JVM-hosted rendering archive plus a separate
//!   CLI tool, invoked as subprocesses over scratch files.
//! * **Remote HTTP**: a rendering service addressed by encoding the
//!   diagram source into the request URL, gated by the rate limiter.
//! * **Containerized CLI**: an orchestration script driving a container,
//!   with bounded execution time and output-directory recovery.
//!
//! The registry holds one instance of each, probes them on first use
//! (cached per session), and flattens every backend error into a
//! `RenderResult::Error` value. Selection is strict: the backend named by
//! classification either serves the request or the request fails with a
//! `BackendUnavailable` diagnostic. There is no silent fallback across
//! backend kinds; only the remote backend's internal SVG-to-PNG format
//! fallback.

pub mod container;
pub mod local;
pub mod remote;
#[cfg(test)]
pub mod stub;

pub use container::ContainerCliBackend;
pub use local::LocalProcessBackend;
pub use remote::RemoteHttpBackend;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::Instrument;

use crate::config::Configuration;
use crate::errors::RenderError;
use crate::observability::messages::backend::{
    ProbeCompleted, RenderCompleted, RenderFailed, RenderStarted,
};
use crate::observability::messages::StructuredLog;
use crate::render::{BackendCapability, BackendKind, OutputFormat, RenderRequest, RenderResult};
use crate::sanitize::sanitize;
use crate::throttle::RateLimiter;
use crate::traits::DiagramBackend;

/// One backend instance per kind, plus a session-scoped probe cache.
///
/// Reconfiguration never mutates a live registry: build a new one from
/// the new `Configuration` and drop this one.
pub struct BackendRegistry {
    backends: HashMap<BackendKind, Arc<dyn DiagramBackend>>,
    probes: Mutex<HashMap<BackendKind, BackendCapability>>,
}

impl BackendRegistry {
    /// Build the production registry: local process, remote HTTP (sharing
    /// one rate limiter), containerized CLI.
    pub fn from_config(config: &Configuration) -> Self {
        let limiter = Arc::new(RateLimiter::from_millis(config.remote_rate_limit_ms));
        let backends: Vec<Arc<dyn DiagramBackend>> = vec![
            Arc::new(LocalProcessBackend::from_config(config)),
            Arc::new(RemoteHttpBackend::from_config(config, limiter)),
            Arc::new(ContainerCliBackend::from_config(config)),
        ];
        Self::with_backends(backends)
    }

    /// Build a registry from explicit instances. This is the injection
    /// seam embedders and tests use to substitute backends.
    pub fn with_backends(backends: Vec<Arc<dyn DiagramBackend>>) -> Self {
        let backends = backends
            .into_iter()
            .map(|backend| (backend.kind(), backend))
            .collect();
        Self {
            backends,
            probes: Mutex::new(HashMap::new()),
        }
    }

    /// Probe a backend, serving from the session cache when possible.
    pub async fn capability(&self, kind: BackendKind) -> BackendCapability {
        if let Some(cached) = self.probes.lock().await.get(&kind) {
            return cached.clone();
        }

        let capability = match self.backends.get(&kind) {
            Some(backend) => backend.probe().await,
            None => BackendCapability::unavailable(kind, "backend not registered"),
        };
        ProbeCompleted {
            kind,
            available: capability.available,
            supported_count: capability.supported_types.len(),
            diagnostic: capability.diagnostic.as_deref(),
        }
        .log();

        self.probes.lock().await.insert(kind, capability.clone());
        capability
    }

    /// Probe every registered backend, in a stable order.
    pub async fn probe_all(&self) -> Vec<BackendCapability> {
        let mut kinds: Vec<BackendKind> = self.backends.keys().copied().collect();
        kinds.sort();
        let mut capabilities = Vec::with_capacity(kinds.len());
        for kind in kinds {
            capabilities.push(self.capability(kind).await);
        }
        capabilities
    }

    /// Dispatch a render to the backend named by classification.
    ///
    /// Never returns an `Err`: backend failures become the error arm of
    /// `RenderResult`, with backend diagnostics carried verbatim. SVG
    /// output is sanitized here, so nothing upstream of this call can
    /// forward unsafe markup to a rendering surface.
    pub async fn dispatch(&self, kind: BackendKind, req: &RenderRequest) -> RenderResult {
        let capability = self.capability(kind).await;
        if !capability.supports(req.diagram_type) {
            let error = RenderError::BackendUnavailable {
                kind,
                diagram_type: req.diagram_type,
                diagnostic: capability.diagnostic.unwrap_or_else(|| {
                    format!("{} diagrams are not supported by this backend", req.diagram_type)
                }),
            };
            RenderFailed {
                kind,
                diagram_type: req.diagram_type,
                error: &error.to_string(),
            }
            .log();
            return error.into_result();
        }

        // `capability` only answers for registered backends, so this
        // lookup cannot miss once the support check passed.
        let backend = match self.backends.get(&kind) {
            Some(backend) => backend,
            None => {
                return RenderError::BackendUnavailable {
                    kind,
                    diagram_type: req.diagram_type,
                    diagnostic: "backend not registered".to_string(),
                }
                .into_result();
            }
        };

        let started_msg = RenderStarted {
            kind,
            diagram_type: req.diagram_type,
            content_size: req.content.len(),
        };
        let span = started_msg.span("backend_render");
        started_msg.log();
        let started = Instant::now();

        // Instrument rather than enter(): an entered guard held across an
        // await would make this future !Send.
        match backend.render(req).instrument(span).await {
            Ok(RenderResult::Svg(svg)) => {
                let clean = sanitize(&svg);
                RenderCompleted {
                    kind,
                    diagram_type: req.diagram_type,
                    format: OutputFormat::Svg,
                    output_size: clean.len(),
                    duration: started.elapsed(),
                }
                .log();
                RenderResult::Svg(clean)
            }
            Ok(RenderResult::Png(png)) => {
                RenderCompleted {
                    kind,
                    diagram_type: req.diagram_type,
                    format: OutputFormat::Png,
                    output_size: png.len(),
                    duration: started.elapsed(),
                }
                .log();
                RenderResult::Png(png)
            }
            Ok(error @ RenderResult::Error { .. }) => error,
            Err(error) => {
                RenderFailed {
                    kind,
                    diagram_type: req.diagram_type,
                    error: &error.to_string(),
                }
                .log();
                error.into_result()
            }
        }
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&BackendKind> = self.backends.keys().collect();
        kinds.sort();
        f.debug_struct("BackendRegistry")
            .field("backends", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::stub::{FailingBackend, StubBackend, UnavailableBackend};
    use super::*;
    use crate::render::{DiagramType, Theme};

    fn request(diagram_type: DiagramType) -> RenderRequest {
        RenderRequest {
            content: "graph TD\nA-->B".to_string(),
            diagram_type,
            theme: Theme::Light,
            cache_key: "key".to_string(),
        }
    }

    #[tokio::test]
    async fn dispatch_sanitizes_svg_output() {
        let stub = StubBackend::new(BackendKind::RemoteHttp).with_result(RenderResult::Svg(
            "<svg><script>alert(1)</script><rect onclick=\"x()\"/></svg>".to_string(),
        ));
        let registry = BackendRegistry::with_backends(vec![Arc::new(stub)]);

        let result = registry
            .dispatch(BackendKind::RemoteHttp, &request(DiagramType::Graphviz))
            .await;
        match result {
            RenderResult::Svg(svg) => {
                assert!(!svg.contains("script"));
                assert!(!svg.contains("onclick"));
                assert!(svg.contains("<rect"));
            }
            other => panic!("expected svg, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn dispatch_flattens_backend_errors_verbatim() {
        let failing = FailingBackend::new(BackendKind::LocalProcess, "Syntax Error? (line 3)");
        let registry = BackendRegistry::with_backends(vec![Arc::new(failing)]);

        let result = registry
            .dispatch(BackendKind::LocalProcess, &request(DiagramType::Plantuml))
            .await;
        match result {
            RenderResult::Error { message } => assert!(message.contains("Syntax Error? (line 3)")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unavailable_backend_fails_without_cross_backend_fallback() {
        let unavailable =
            UnavailableBackend::new(BackendKind::LocalProcess, "interpreter not found");
        let healthy = StubBackend::new(BackendKind::RemoteHttp);
        let registry =
            BackendRegistry::with_backends(vec![Arc::new(unavailable), Arc::new(healthy)]);

        let result = registry
            .dispatch(BackendKind::LocalProcess, &request(DiagramType::Plantuml))
            .await;
        match result {
            RenderResult::Error { message } => {
                assert!(message.contains("interpreter not found"));
            }
            other => panic!("expected error, got {:?}", other),
        }

        // The healthy remote backend was never consulted.
        let remote_capability = registry.capability(BackendKind::RemoteHttp).await;
        assert!(remote_capability.available);
    }

    #[tokio::test]
    async fn probes_are_cached_per_session() {
        let unavailable = Arc::new(UnavailableBackend::new(
            BackendKind::ContainerCli,
            "no runtime",
        ));
        let registry =
            BackendRegistry::with_backends(vec![Arc::clone(&unavailable) as Arc<dyn DiagramBackend>]);

        let _ = registry.capability(BackendKind::ContainerCli).await;
        let _ = registry.capability(BackendKind::ContainerCli).await;
        let _ = registry
            .dispatch(BackendKind::ContainerCli, &request(DiagramType::Structurizr))
            .await;

        assert_eq!(unavailable.probe_count(), 1);
    }

    #[tokio::test]
    async fn unregistered_kind_reports_unavailable() {
        let registry = BackendRegistry::with_backends(vec![]);
        let result = registry
            .dispatch(BackendKind::RemoteHttp, &request(DiagramType::Mermaid))
            .await;
        assert!(result.is_error());
    }
}
