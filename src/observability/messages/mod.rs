// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for human-readable output plus
//! the [`StructuredLog`] trait, which emits the same message as a
//! `tracing` event with structured fields attached.
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_lightbox::observability::messages::engine::PreviewScheduled;
//! use the_lightbox::observability::messages::StructuredLog;
//!
//! let msg = PreviewScheduled {
//!     sequence: 7,
//!     debounce_ms: 300,
//! };
//! msg.log();
//! ```

use tracing::Span;

pub mod backend;
pub mod classify;
pub mod engine;
pub mod sanitize;

/// Emit a message through the `tracing` facade with structured fields.
///
/// `log` picks the level appropriate to the event; `span` produces an
/// instrumentation span carrying the same fields, for wrapping the work
/// the message describes. The default `span` implementation carries only
/// the operation name; message types with fields worth propagating
/// override it.
pub trait StructuredLog: std::fmt::Display {
    fn log(&self);

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("operation", operation = name)
    }
}
