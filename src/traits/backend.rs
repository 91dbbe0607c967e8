// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::RenderError;
use crate::render::{BackendCapability, BackendKind, RenderRequest, RenderResult};

/// Uniform contract over the three render execution strategies.
///
/// Implementations reconcile very different execution models (local
/// subprocess, network round trip, container exec) behind these two
/// operations. `probe` is side-effect-free apart from whatever external
/// process/network calls it takes to answer; `render` may fail, and the
/// registry flattens its errors into `RenderResult::Error` values.
#[async_trait]
pub trait DiagramBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Report availability and the diagram types this backend can serve
    /// right now. Recomputed on demand; the registry caches results per
    /// session only.
    async fn probe(&self) -> BackendCapability;

    async fn render(&self, req: &RenderRequest) -> Result<RenderResult, RenderError>;
}
