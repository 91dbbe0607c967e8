// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for sanitizer interventions and failures.

use std::fmt::{Display, Formatter};

use crate::observability::messages::StructuredLog;

/// The sanitizer removed active content from rendered SVG.
///
/// # Log Level
/// `debug!` - stripping is routine for some backends' output
pub struct UnsafeMarkupStripped {
    pub scripts: usize,
    pub event_handlers: usize,
    pub unsafe_refs: usize,
}

impl UnsafeMarkupStripped {
    pub fn is_empty(&self) -> bool {
        self.scripts == 0 && self.event_handlers == 0 && self.unsafe_refs == 0
    }
}

impl Display for UnsafeMarkupStripped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Sanitizer stripped {} script element(s), {} event handler(s), {} unsafe reference(s)",
            self.scripts, self.event_handlers, self.unsafe_refs
        )
    }
}

impl StructuredLog for UnsafeMarkupStripped {
    fn log(&self) {
        tracing::debug!(
            scripts = self.scripts,
            event_handlers = self.event_handlers,
            unsafe_refs = self.unsafe_refs,
            "{}",
            self
        );
    }
}

/// The SVG could not be parsed; output degraded to an empty document.
///
/// Logged even though the only UI effect is an empty rendering: a parse
/// failure here usually means a backend emitted garbage.
///
/// # Log Level
/// `warn!`
pub struct SanitizationFailed<'a> {
    pub reason: &'a str,
}

impl Display for SanitizationFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "SVG sanitization failed, output degraded to empty: {}",
            self.reason
        )
    }
}

impl StructuredLog for SanitizationFailed<'_> {
    fn log(&self) {
        tracing::warn!(reason = self.reason, "{}", self);
    }
}
