// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and
//! operational logging in the rendering engine. Message types follow a
//! struct-based pattern with `Display` trait implementation to:
//!
//! * Eliminate magic strings scattered throughout the codebase
//! * Enable future internationalization without code changes
//! * Provide consistent, structured logging output
//!
//! Core logic never writes to the console directly; everything goes
//! through these types and the `tracing` facade, so embedders choose the
//! subscriber (the bundled CLI installs `tracing-subscriber` fmt output).
//!
//! # Organization
//!
//! Messages are organized by subsystem:
//! * `messages::backend` - backend probing and render execution events
//! * `messages::classify` - classification outcomes
//! * `messages::engine` - preview controller and batch export lifecycle
//! * `messages::sanitize` - sanitizer interventions and failures

pub mod messages;
