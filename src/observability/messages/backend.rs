// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for backend probing and render execution events.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use tracing::Span;

use crate::observability::messages::StructuredLog;
use crate::render::{BackendKind, DiagramType, OutputFormat};

/// A backend probe settled.
///
/// # Log Level
/// `info!` when available, `warn!` when not
pub struct ProbeCompleted<'a> {
    pub kind: BackendKind,
    pub available: bool,
    pub supported_count: usize,
    pub diagnostic: Option<&'a str>,
}

impl Display for ProbeCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.available {
            write!(
                f,
                "Backend '{}' available: {} diagram type(s) supported",
                self.kind, self.supported_count
            )
        } else {
            write!(
                f,
                "Backend '{}' unavailable: {}",
                self.kind,
                self.diagnostic.unwrap_or("no diagnostic")
            )
        }
    }
}

impl StructuredLog for ProbeCompleted<'_> {
    fn log(&self) {
        if self.available {
            tracing::info!(
                backend = self.kind.as_str(),
                supported_count = self.supported_count,
                "{}",
                self
            );
        } else {
            tracing::warn!(
                backend = self.kind.as_str(),
                diagnostic = self.diagnostic.unwrap_or(""),
                "{}",
                self
            );
        }
    }
}

/// A render was dispatched to a backend.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RenderStarted {
    pub kind: BackendKind,
    pub diagram_type: DiagramType,
    pub content_size: usize,
}

impl Display for RenderStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rendering {} diagram via '{}': {} bytes of source",
            self.diagram_type, self.kind, self.content_size
        )
    }
}

impl StructuredLog for RenderStarted {
    fn log(&self) {
        tracing::info!(
            backend = self.kind.as_str(),
            diagram_type = self.diagram_type.as_str(),
            content_size = self.content_size,
            "{}",
            self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "render",
            span_name = name,
            backend = self.kind.as_str(),
            diagram_type = self.diagram_type.as_str(),
        )
    }
}

/// A render settled successfully.
pub struct RenderCompleted {
    pub kind: BackendKind,
    pub diagram_type: DiagramType,
    pub format: OutputFormat,
    pub output_size: usize,
    pub duration: Duration,
}

impl Display for RenderCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rendered {} diagram via '{}': {} bytes of {} in {:?}",
            self.diagram_type, self.kind, self.output_size, self.format, self.duration
        )
    }
}

impl StructuredLog for RenderCompleted {
    fn log(&self) {
        tracing::info!(
            backend = self.kind.as_str(),
            diagram_type = self.diagram_type.as_str(),
            format = self.format.as_str(),
            output_size = self.output_size,
            duration_ms = self.duration.as_millis() as u64,
            "{}",
            self
        );
    }
}

/// A render failed. The error text is surfaced to the user as well; this
/// event exists so failures are never silent even when the UI drops them.
///
/// # Log Level
/// `warn!` - failures are expected during editing (syntax errors)
pub struct RenderFailed<'a> {
    pub kind: BackendKind,
    pub diagram_type: DiagramType,
    pub error: &'a str,
}

impl Display for RenderFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Render of {} diagram via '{}' failed: {}",
            self.diagram_type, self.kind, self.error
        )
    }
}

impl StructuredLog for RenderFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            backend = self.kind.as_str(),
            diagram_type = self.diagram_type.as_str(),
            error = self.error,
            "{}",
            self
        );
    }
}
