// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Live preview controller.
//!
//! The controller owns the `Idle -> Scheduled -> Rendering ->
//! (Displayed | Errored) -> Idle` lifecycle for one preview session:
//!
//! * Edit and theme events (re)start a debounce timer; a new event while
//!   one is scheduled restarts the timer rather than stacking requests.
//! * When the timer fires, the update captures the next value of a
//!   monotonically increasing sequence number, emits `Loading`, and runs
//!   the shared render pass.
//! * Before a settled state is pushed, the captured sequence number is
//!   compared against the latest issued one; stale results are discarded
//!   without any UI push. In-flight subprocess or network work is never
//!   force-cancelled; it runs to completion and its result is dropped.
//!
//! The controller talks to the presentation surface through a typed
//! outbound channel only; it holds no reference to presentation objects.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::backends::BackendRegistry;
use crate::cache::RenderCache;
use crate::classify::Classifier;
use crate::engine::{render_source, SessionContext};
use crate::observability::messages::engine::{
    PreviewScheduled, SessionClosed, StaleResultDiscarded,
};
use crate::observability::messages::StructuredLog;
use crate::render::{ClassificationResult, DiagramSource, PreviewState, Theme};

pub struct PreviewController {
    classifier: Classifier,
    registry: Arc<BackendRegistry>,
    cache: Arc<Mutex<RenderCache>>,
    states: UnboundedSender<PreviewState>,
    sequence: Arc<AtomicU64>,
    debounce: Duration,
    theme: Theme,
    last_source: Option<DiagramSource>,
    pending: Option<CancellationToken>,
    session: CancellationToken,
}

impl PreviewController {
    pub fn new(context: &SessionContext, states: UnboundedSender<PreviewState>) -> Self {
        Self {
            classifier: Classifier::from_config(&context.config),
            registry: Arc::clone(&context.registry),
            cache: Arc::clone(&context.cache),
            states,
            sequence: Arc::new(AtomicU64::new(0)),
            debounce: Duration::from_millis(context.config.debounce_ms),
            theme: Theme::default(),
            last_source: None,
            pending: None,
            session: CancellationToken::new(),
        }
    }

    /// The source text changed; schedule an update behind the debounce
    /// timer.
    pub fn source_changed(&mut self, source: DiagramSource) {
        self.last_source = Some(source.clone());
        self.schedule(source, None, self.debounce);
    }

    /// The theme changed; re-render the current source under the new
    /// theme.
    pub fn theme_changed(&mut self, theme: Theme) {
        self.theme = theme;
        if let Some(source) = self.last_source.clone() {
            self.schedule(source, None, self.debounce);
        }
    }

    /// Render with a caller-supplied classification, used after an
    /// ambiguous classification prompted the user for a manual choice.
    /// The choice applies to this render only (it is not persisted as a
    /// new mapping) and skips the debounce since it answers an explicit
    /// action.
    pub fn render_with_override(
        &mut self,
        source: DiagramSource,
        classification: ClassificationResult,
    ) {
        self.last_source = Some(source.clone());
        self.schedule(source, Some(classification), Duration::ZERO);
    }

    /// Tear the session down: cancel anything scheduled and clear the
    /// cache. Backend instances go away when the context's registry is
    /// dropped.
    pub async fn shutdown(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
        self.session.cancel();
        self.cache.lock().await.clear();
        SessionClosed.log();
    }

    fn schedule(
        &mut self,
        source: DiagramSource,
        override_classification: Option<ClassificationResult>,
        debounce: Duration,
    ) {
        // Restart rather than stack: a newer event supersedes whatever
        // was waiting on the timer.
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
        let token = self.session.child_token();
        self.pending = Some(token.clone());

        let classifier = self.classifier;
        let registry = Arc::clone(&self.registry);
        let cache = Arc::clone(&self.cache);
        let states = self.states.clone();
        let sequence = Arc::clone(&self.sequence);
        let theme = self.theme;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }

            let seq = sequence.fetch_add(1, Ordering::SeqCst) + 1;
            PreviewScheduled {
                sequence: seq,
                debounce_ms: debounce.as_millis() as u64,
            }
            .log();
            let _ = states.send(PreviewState::Loading);

            let result = render_source(
                &classifier,
                &registry,
                &cache,
                &source,
                theme,
                override_classification,
            )
            .await;

            // The staleness guard: only the most recently issued
            // request's result may reach the surface.
            let latest = sequence.load(Ordering::SeqCst);
            if latest != seq {
                StaleResultDiscarded {
                    sequence: seq,
                    latest,
                }
                .log();
                return;
            }
            let _ = states.send(PreviewState::from_result(result));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::StubBackend;
    use crate::config::Configuration;
    use crate::render::{BackendKind, RenderResult};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn context_with(backend: Arc<StubBackend>) -> SessionContext {
        let config = Arc::new(Configuration {
            debounce_ms: 50,
            ..Configuration::default()
        });
        let registry = Arc::new(BackendRegistry::with_backends(vec![
            backend as Arc<dyn crate::traits::DiagramBackend>,
        ]));
        SessionContext::with_registry(config, registry)
    }

    async fn next_settled(
        states: &mut mpsc::UnboundedReceiver<PreviewState>,
    ) -> Option<PreviewState> {
        loop {
            let state = timeout(Duration::from_secs(2), states.recv())
                .await
                .ok()??;
            if state.is_settled() {
                return Some(state);
            }
        }
    }

    #[tokio::test]
    async fn rapid_edits_collapse_into_one_render() {
        let backend = Arc::new(StubBackend::new(BackendKind::LocalProcess));
        let context = context_with(Arc::clone(&backend));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = PreviewController::new(&context, tx);

        for text in ["graph TD\nA", "graph TD\nA-", "graph TD\nA-->B"] {
            controller.source_changed(DiagramSource::new("/w/flow.mmd", text));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let settled = next_settled(&mut rx).await.expect("no settled state");
        assert!(matches!(settled, PreviewState::Svg { .. }));
        assert_eq!(backend.render_count(), 1);
    }

    #[tokio::test]
    async fn identical_content_hits_the_cache_on_the_second_pass() {
        let backend = Arc::new(StubBackend::new(BackendKind::LocalProcess));
        let context = context_with(Arc::clone(&backend));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = PreviewController::new(&context, tx);

        let source = DiagramSource::new("/w/flow.mmd", "graph TD\nA-->B");
        controller.source_changed(source.clone());
        let first = next_settled(&mut rx).await.expect("no first state");
        controller.source_changed(source);
        let second = next_settled(&mut rx).await.expect("no second state");

        assert_eq!(first, second);
        assert_eq!(backend.render_count(), 1);
    }

    #[tokio::test]
    async fn ambiguous_source_surfaces_an_error_state() {
        let backend = Arc::new(StubBackend::new(BackendKind::LocalProcess));
        let context = context_with(backend);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = PreviewController::new(&context, tx);

        controller.source_changed(DiagramSource::new("/w/notes", "just some prose"));
        let settled = next_settled(&mut rx).await.expect("no settled state");
        match settled {
            PreviewState::Error { message } => assert!(message.contains("manually")),
            other => panic!("expected error state, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn override_classification_renders_without_debounce() {
        let backend = Arc::new(StubBackend::new(BackendKind::LocalProcess));
        let context = context_with(Arc::clone(&backend));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = PreviewController::new(&context, tx);

        controller.render_with_override(
            DiagramSource::new("/w/notes", "A -> B"),
            ClassificationResult::new(
                BackendKind::LocalProcess,
                crate::render::DiagramType::Plantuml,
            ),
        );
        let settled = next_settled(&mut rx).await.expect("no settled state");
        assert!(matches!(settled, PreviewState::Svg { .. }));
        assert_eq!(backend.render_count(), 1);
    }

    #[tokio::test]
    async fn theme_change_rerenders_the_current_source() {
        let backend = Arc::new(StubBackend::new(BackendKind::LocalProcess));
        let context = context_with(Arc::clone(&backend));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = PreviewController::new(&context, tx);

        controller.source_changed(DiagramSource::new("/w/flow.mmd", "graph TD\nA-->B"));
        let _ = next_settled(&mut rx).await.expect("no settled state");

        controller.theme_changed(Theme::Dark);
        let _ = next_settled(&mut rx).await.expect("no re-render after theme change");
        // Mermaid via the local toolchain is theme-aware, so the dark
        // render cannot be served from the light cache entry.
        assert_eq!(backend.render_count(), 2);
    }

    #[tokio::test]
    async fn theme_change_without_a_source_is_a_no_op() {
        let backend = Arc::new(StubBackend::new(BackendKind::LocalProcess));
        let context = context_with(backend);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = PreviewController::new(&context, tx);

        controller.theme_changed(Theme::Dark);
        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn shutdown_cancels_scheduled_work_and_clears_the_cache() {
        let backend = Arc::new(StubBackend::new(BackendKind::LocalProcess));
        let context = context_with(Arc::clone(&backend));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = PreviewController::new(&context, tx);

        controller.source_changed(DiagramSource::new("/w/flow.mmd", "graph TD\nA-->B"));
        controller.shutdown().await;

        assert!(timeout(Duration::from_millis(150), rx.recv()).await.is_err());
        assert_eq!(backend.render_count(), 0);
        assert!(context.cache.lock().await.is_empty());
    }

    #[tokio::test]
    async fn errors_are_not_cached_so_the_next_edit_retries() {
        let failing = Arc::new(
            StubBackend::new(BackendKind::LocalProcess)
                .with_result(RenderResult::error("transient fault")),
        );
        let context = context_with(Arc::clone(&failing));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut controller = PreviewController::new(&context, tx);

        let source = DiagramSource::new("/w/flow.mmd", "graph TD\nA-->B");
        controller.source_changed(source.clone());
        let _ = next_settled(&mut rx).await;
        controller.source_changed(source);
        let _ = next_settled(&mut rx).await;

        assert_eq!(failing.render_count(), 2);
        assert!(context.cache.lock().await.is_empty());
    }
}
