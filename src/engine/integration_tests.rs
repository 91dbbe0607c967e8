// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! End-to-end tests for the preview engine: classification through
//! dispatch, sanitization, caching, and the staleness guard, against
//! fake local tools and a loopback HTTP listener.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::backends::stub::EchoBackend;
use crate::backends::BackendRegistry;
use crate::config::Configuration;
use crate::engine::{PreviewController, SessionContext};
use crate::render::{BackendKind, DiagramSource, PreviewState};

async fn next_state(rx: &mut mpsc::UnboundedReceiver<PreviewState>) -> PreviewState {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a preview state")
        .expect("state channel closed")
}

async fn next_settled(rx: &mut mpsc::UnboundedReceiver<PreviewState>) -> PreviewState {
    loop {
        let state = next_state(rx).await;
        if state.is_settled() {
            return state;
        }
    }
}

/// A `.mmd` file renders through the Mermaid path to a non-empty SVG
/// with no network access: the "remote" side of this test is a fake CLI
/// on disk.
#[cfg(unix)]
#[tokio::test]
async fn mermaid_file_renders_locally_end_to_end() {
    use std::os::unix::fs::PermissionsExt;

    let scratch = tempfile::tempdir().unwrap();
    let cli = scratch.path().join("fake-mmdc");
    std::fs::write(
        &cli,
        "#!/bin/sh\nout=\"$4\"\nprintf '<svg xmlns=\"http://www.w3.org/2000/svg\"><g class=\"seq\"><rect/></g></svg>' > \"$out\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&cli, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut config = Configuration {
        debounce_ms: 10,
        ..Configuration::default()
    };
    config.local_tools.cli_path = Some(cli);
    let context = SessionContext::new(Arc::new(config));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = PreviewController::new(&context, tx);

    controller.source_changed(DiagramSource::new(
        scratch.path().join("seq.mmd"),
        "sequenceDiagram\n  A->>B: hi",
    ));

    assert_eq!(next_state(&mut rx).await, PreviewState::Loading);
    match next_settled(&mut rx).await {
        PreviewState::Svg { content } => {
            assert!(!content.is_empty());
            assert!(content.contains("<rect"));
        }
        other => panic!("expected svg, got {:?}", other),
    }
}

/// A `.dsl` source classifies to Structurizr on the remote backend, and
/// a forced remote failure surfaces as an error state with the HTTP
/// status embedded in the message.
#[tokio::test]
async fn structurizr_remote_failure_carries_the_status_code() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());

    // One response for the SVG attempt, one for the PNG format fallback.
    tokio::spawn(async move {
        for _ in 0..2 {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let body = "Unable to parse workspace definition";
            let response = format!(
                "HTTP/1.1 400 Bad Request\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });

    let config = Configuration {
        remote_endpoint: endpoint,
        remote_rate_limit_ms: 0,
        debounce_ms: 10,
        ..Configuration::default()
    };
    let context = SessionContext::new(Arc::new(config));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = PreviewController::new(&context, tx);

    controller.source_changed(DiagramSource::new(
        "/ws/system.dsl",
        "workspace \"X\" {\n  model {}\n}",
    ));

    match next_settled(&mut rx).await {
        PreviewState::Error { message } => {
            assert!(message.contains("400"), "message: {}", message);
            assert!(
                message.contains("Unable to parse workspace definition"),
                "message: {}",
                message
            );
        }
        other => panic!("expected error, got {:?}", other),
    }
}

/// The staleness guard: when request 1 completes after request 2, its
/// result never reaches the surface.
#[tokio::test]
async fn stale_results_are_never_surfaced() {
    // Only the first revision renders slowly, so request 1 genuinely
    // completes after request 2 in wall-clock order.
    let backend = Arc::new(
        EchoBackend::new(BackendKind::LocalProcess)
            .with_delay(Duration::from_millis(250))
            .with_delay_marker("revision-one"),
    );
    let config = Arc::new(Configuration {
        debounce_ms: 10,
        ..Configuration::default()
    });
    let registry = Arc::new(BackendRegistry::with_backends(vec![
        backend as Arc<dyn crate::traits::DiagramBackend>,
    ]));
    let context = SessionContext::with_registry(config, registry);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = PreviewController::new(&context, tx);

    controller.source_changed(DiagramSource::new("/w/flow.mmd", "graph TD\nrevision-one"));
    // Request 1 is in flight once its Loading state arrives.
    assert_eq!(next_state(&mut rx).await, PreviewState::Loading);

    controller.source_changed(DiagramSource::new("/w/flow.mmd", "graph TD\nrevision-two"));
    assert_eq!(next_state(&mut rx).await, PreviewState::Loading);

    // The only settled state is request 2's; request 1 completed first
    // in wall-clock order here, was already superseded, and is dropped.
    match next_settled(&mut rx).await {
        PreviewState::Svg { content } => assert!(content.contains("revision-two")),
        other => panic!("expected svg, got {:?}", other),
    }
    assert!(
        timeout(Duration::from_millis(400), rx.recv()).await.is_err(),
        "a stale result leaked to the surface"
    );
}
