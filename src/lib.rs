// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // render execution backends
pub mod cache;      // content-addressed render cache
pub mod classify;   // source -> (backend, diagram type) resolution
pub mod config;     // layered configuration
pub mod engine;     // preview controller + batch exporter
pub mod errors;     // error handling
pub mod observability;
pub mod render;     // core data model
pub mod sanitize;   // SVG output sanitizer
pub mod throttle;   // outbound rate limiting
pub mod traits;     // unified abstractions
