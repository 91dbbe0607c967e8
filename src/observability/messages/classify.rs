// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for classification outcomes.

use std::fmt::{Display, Formatter};
use std::path::Path;

use crate::observability::messages::StructuredLog;
use crate::render::{BackendKind, DiagramType};

/// A source was classified, either by extension or by a content rule.
///
/// # Log Level
/// `debug!` - happens on every keystroke burst
pub struct ClassificationResolved<'a> {
    pub backend: BackendKind,
    pub diagram_type: Option<DiagramType>,
    pub rule: &'a str,
}

impl Display for ClassificationResolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.diagram_type {
            Some(dt) => write!(
                f,
                "Classified as {} on '{}' (rule: {})",
                dt, self.backend, self.rule
            ),
            None => write!(
                f,
                "Classified to backend '{}' with type left to backend detection (rule: {})",
                self.backend, self.rule
            ),
        }
    }
}

impl StructuredLog for ClassificationResolved<'_> {
    fn log(&self) {
        tracing::debug!(
            backend = self.backend.as_str(),
            diagram_type = self.diagram_type.map(|d| d.as_str()).unwrap_or(""),
            rule = self.rule,
            "{}",
            self
        );
    }
}

/// No extension mapping or content rule matched.
///
/// # Log Level
/// `info!` - the user will be prompted for a manual choice
pub struct ClassificationAmbiguous<'a> {
    pub path: &'a Path,
}

impl Display for ClassificationAmbiguous<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "No classification rule matched '{}'; manual selection required",
            self.path.display()
        )
    }
}

impl StructuredLog for ClassificationAmbiguous<'_> {
    fn log(&self) {
        tracing::info!(path = %self.path.display(), "{}", self);
    }
}
