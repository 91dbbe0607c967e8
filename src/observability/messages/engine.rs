// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for preview controller and batch export lifecycle events.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use tracing::Span;

use crate::observability::messages::StructuredLog;

/// A preview update was scheduled behind the debounce timer.
///
/// # Log Level
/// `debug!` - fires on every settled edit burst
pub struct PreviewScheduled {
    pub sequence: u64,
    pub debounce_ms: u64,
}

impl Display for PreviewScheduled {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Preview update #{} scheduled after {}ms debounce",
            self.sequence, self.debounce_ms
        )
    }
}

impl StructuredLog for PreviewScheduled {
    fn log(&self) {
        tracing::debug!(
            sequence = self.sequence,
            debounce_ms = self.debounce_ms,
            "{}",
            self
        );
    }
}

/// A completed render was dropped because a newer request superseded it.
///
/// This is the staleness guard working as intended, not an error.
///
/// # Log Level
/// `debug!`
pub struct StaleResultDiscarded {
    pub sequence: u64,
    pub latest: u64,
}

impl Display for StaleResultDiscarded {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Discarded stale render result #{} (latest request is #{})",
            self.sequence, self.latest
        )
    }
}

impl StructuredLog for StaleResultDiscarded {
    fn log(&self) {
        tracing::debug!(sequence = self.sequence, latest = self.latest, "{}", self);
    }
}

/// The render cache served a request without touching any backend.
///
/// # Log Level
/// `debug!`
pub struct CacheHit<'a> {
    pub key: &'a str,
}

impl Display for CacheHit<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Render cache hit for key '{}'", self.key)
    }
}

impl StructuredLog for CacheHit<'_> {
    fn log(&self) {
        tracing::debug!(key = self.key, "{}", self);
    }
}

/// Batch export started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct BatchStarted {
    pub file_count: usize,
    pub concurrency: usize,
}

impl Display for BatchStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting batch export of {} file(s) with concurrency {}",
            self.file_count, self.concurrency
        )
    }
}

impl StructuredLog for BatchStarted {
    fn log(&self) {
        tracing::info!(
            file_count = self.file_count,
            concurrency = self.concurrency,
            "{}",
            self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "batch_export",
            span_name = name,
            file_count = self.file_count,
            concurrency = self.concurrency,
        )
    }
}

/// Batch export finished; failures are per-file and already reported.
///
/// # Log Level
/// `info!`
pub struct BatchCompleted {
    pub succeeded: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl Display for BatchCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Batch export complete: {} succeeded, {} failed in {:?}",
            self.succeeded, self.failed, self.duration
        )
    }
}

impl StructuredLog for BatchCompleted {
    fn log(&self) {
        tracing::info!(
            succeeded = self.succeeded,
            failed = self.failed,
            duration_ms = self.duration.as_millis() as u64,
            "{}",
            self
        );
    }
}

/// A preview session was torn down; backends and cache are gone.
///
/// # Log Level
/// `debug!`
pub struct SessionClosed;

impl Display for SessionClosed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Preview session closed; backends disposed and cache cleared")
    }
}

impl StructuredLog for SessionClosed {
    fn log(&self) {
        tracing::debug!("{}", self);
    }
}
