// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for render orchestration.
//!
//! Every variant here is eventually flattened into a
//! `RenderResult::Error` at the registry boundary; the taxonomy exists so
//! call sites can distinguish recoverable conditions (ambiguous
//! classification, transient remote failures) from hard ones without
//! string matching. All errors implement `std::error::Error` via the
//! `thiserror` crate.

use std::time::Duration;

use thiserror::Error;

use crate::render::{BackendKind, DiagramType, RenderResult};

/// Errors raised while classifying, dispatching, or executing a render.
#[derive(Error, Debug)]
pub enum RenderError {
    /// No classification rule matched the source. Recoverable: the caller
    /// may supply an explicit backend/type override for this render only.
    #[error("could not determine a diagram type for this source; select a backend and diagram type manually")]
    ClassificationAmbiguous,

    /// The selected backend cannot serve the required diagram type.
    /// Reported as-is, never silently retried against another backend.
    #[error("backend '{kind}' is not available for {diagram_type} diagrams: {diagnostic}")]
    BackendUnavailable {
        kind: BackendKind,
        diagram_type: DiagramType,
        diagnostic: String,
    },

    /// The backend rejected the input (typically a syntax error). The
    /// message carries the backend's own diagnostic text verbatim.
    #[error("{kind} rejected the diagram: {message}")]
    Client { kind: BackendKind, message: String },

    /// The remote service failed on its side. Transient; reported with the
    /// status so the user can retry on the next edit.
    #[error("remote rendering service error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// A bounded operation ran out of time.
    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    /// The remote service could not be reached.
    #[error("could not reach the rendering service: {0}")]
    Connection(String),

    /// Rendered SVG could not be parsed; output degrades to empty.
    #[error("sanitization failed: {0}")]
    Sanitization(String),

    /// An external tool misbehaved in a way that is not a syntax rejection
    /// (missing output file, unparseable logs, broken pipes).
    #[error("render tooling failure: {0}")]
    Tooling(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    /// Flatten into the value-level error arm surfaced to consumers.
    pub fn into_result(self) -> RenderResult {
        RenderResult::Error {
            message: self.to_string(),
        }
    }

    /// Transient failures get a retry-later hint in user-facing text;
    /// nothing in the core retries them automatically.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RenderError::Server { .. } | RenderError::Timeout(_) | RenderError::Connection(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_is_embedded_in_message() {
        let err = RenderError::Server {
            status: 503,
            message: "overloaded".into(),
        };
        let result = err.into_result();
        match result {
            RenderResult::Error { message } => {
                assert!(message.contains("503"));
                assert!(message.contains("overloaded"));
            }
            other => panic!("expected error arm, got {:?}", other),
        }
    }

    #[test]
    fn transient_classification() {
        assert!(RenderError::Timeout(Duration::from_secs(60)).is_transient());
        assert!(RenderError::Connection("refused".into()).is_transient());
        assert!(!RenderError::ClassificationAmbiguous.is_transient());
        assert!(!RenderError::Client {
            kind: BackendKind::RemoteHttp,
            message: "bad syntax".into()
        }
        .is_transient());
    }
}
