// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::RenderError;
use crate::render::{
    BackendCapability, BackendKind, DiagramType, RenderRequest, RenderResult,
};
use crate::traits::DiagramBackend;

/// A stub backend for exercising the registry and engine without any
/// external tooling. Serves every diagram type, optionally after a
/// configurable delay, and counts how often it was asked to render.
pub struct StubBackend {
    kind: BackendKind,
    result: RenderResult,
    delay: Duration,
    renders: AtomicUsize,
}

impl StubBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            result: RenderResult::Svg("<svg xmlns=\"http://www.w3.org/2000/svg\"><rect/></svg>".to_string()),
            delay: Duration::ZERO,
            renders: AtomicUsize::new(0),
        }
    }

    pub fn with_result(mut self, result: RenderResult) -> Self {
        self.result = result;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DiagramBackend for StubBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn probe(&self) -> BackendCapability {
        BackendCapability {
            kind: self.kind,
            available: true,
            supported_types: BTreeSet::from([
                DiagramType::Mermaid,
                DiagramType::Plantuml,
                DiagramType::Graphviz,
                DiagramType::Structurizr,
            ]),
            diagnostic: None,
        }
    }

    async fn render(&self, _req: &RenderRequest) -> Result<RenderResult, RenderError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.result.clone())
    }
}

/// A backend that folds the request content into its output, so tests
/// can tell which request a result came from.
pub struct EchoBackend {
    kind: BackendKind,
    delay: Duration,
    /// When set, the delay applies only to requests whose content
    /// contains this marker, letting tests slow down one request while
    /// others complete immediately.
    delay_marker: Option<String>,
}

impl EchoBackend {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            delay: Duration::ZERO,
            delay_marker: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_delay_marker(mut self, marker: impl Into<String>) -> Self {
        self.delay_marker = Some(marker.into());
        self
    }
}

#[async_trait::async_trait]
impl DiagramBackend for EchoBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn probe(&self) -> BackendCapability {
        BackendCapability {
            kind: self.kind,
            available: true,
            supported_types: BTreeSet::from([
                DiagramType::Mermaid,
                DiagramType::Plantuml,
                DiagramType::Graphviz,
                DiagramType::Structurizr,
            ]),
            diagnostic: None,
        }
    }

    async fn render(&self, req: &RenderRequest) -> Result<RenderResult, RenderError> {
        let delayed = match &self.delay_marker {
            Some(marker) => req.content.contains(marker),
            None => true,
        };
        if delayed && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(RenderResult::Svg(format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\"><text>{}</text></svg>",
            req.content
        )))
    }
}

/// A backend whose renders always fail with a client error.
pub struct FailingBackend {
    kind: BackendKind,
    message: String,
}

impl FailingBackend {
    pub fn new(kind: BackendKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[async_trait::async_trait]
impl DiagramBackend for FailingBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn probe(&self) -> BackendCapability {
        BackendCapability {
            kind: self.kind,
            available: true,
            supported_types: BTreeSet::from([
                DiagramType::Mermaid,
                DiagramType::Plantuml,
                DiagramType::Graphviz,
                DiagramType::Structurizr,
            ]),
            diagnostic: None,
        }
    }

    async fn render(&self, _req: &RenderRequest) -> Result<RenderResult, RenderError> {
        Err(RenderError::Client {
            kind: self.kind,
            message: self.message.clone(),
        })
    }
}

/// A backend that always probes unavailable, counting the probes it sees.
pub struct UnavailableBackend {
    kind: BackendKind,
    diagnostic: String,
    probes: AtomicUsize,
}

impl UnavailableBackend {
    pub fn new(kind: BackendKind, diagnostic: impl Into<String>) -> Self {
        Self {
            kind,
            diagnostic: diagnostic.into(),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DiagramBackend for UnavailableBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn probe(&self) -> BackendCapability {
        self.probes.fetch_add(1, Ordering::SeqCst);
        BackendCapability::unavailable(self.kind, self.diagnostic.clone())
    }

    async fn render(&self, _req: &RenderRequest) -> Result<RenderResult, RenderError> {
        Err(RenderError::BackendUnavailable {
            kind: self.kind,
            diagram_type: DiagramType::Mermaid,
            diagnostic: self.diagnostic.clone(),
        })
    }
}
