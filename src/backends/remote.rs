// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Remote-HTTP backend.
//!
//! Diagram source travels *in the URL*: raw source is deflate-compressed
//! and URL-safe base64 encoded, then requested as
//! `GET {endpoint}/{diagram-type}/{svg|png}/{payload}`. Every request is
//! gated by the shared rate limiter.
//!
//! Availability is assumed until a render proves otherwise; a probe that
//! performed a real network round trip would cost as much as the render
//! itself.

use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::config::consts::REMOTE_REQUEST_TIMEOUT;
use crate::config::Configuration;
use crate::errors::RenderError;
use crate::render::{
    BackendCapability, BackendKind, DiagramType, OutputFormat, RenderRequest, RenderResult,
};
use crate::throttle::RateLimiter;
use crate::traits::DiagramBackend;

pub struct RemoteHttpBackend {
    endpoint: String,
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
}

impl RemoteHttpBackend {
    pub fn from_config(config: &Configuration, limiter: Arc<RateLimiter>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REMOTE_REQUEST_TIMEOUT)
            .user_agent(concat!("the-lightbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            endpoint: config.remote_endpoint.trim_end_matches('/').to_string(),
            client,
            limiter,
        }
    }

    async fn request(
        &self,
        diagram_type: DiagramType,
        format: OutputFormat,
        payload: &str,
    ) -> Result<RenderResult, RenderError> {
        let url = render_url(&self.endpoint, diagram_type, format, payload);
        let response = self
            .limiter
            .throttle(self.client.get(&url).send())
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return match format {
                OutputFormat::Svg => {
                    let body = response.text().await.map_err(transport_error)?;
                    Ok(RenderResult::Svg(body))
                }
                OutputFormat::Png => {
                    let body = response.bytes().await.map_err(transport_error)?;
                    Ok(RenderResult::Png(body.to_vec()))
                }
            };
        }

        // The service puts its diagnostic (syntax error text and position)
        // in the body of a 4xx response; carry it verbatim.
        let body = response.text().await.unwrap_or_default();
        let body = body.trim().to_string();
        if status.is_client_error() {
            Err(RenderError::Client {
                kind: BackendKind::RemoteHttp,
                message: format!("HTTP {}: {}", status.as_u16(), body),
            })
        } else {
            Err(RenderError::Server {
                status: status.as_u16(),
                message: body,
            })
        }
    }
}

/// Compress and encode diagram source for the URL path.
pub fn encode_payload(content: &str) -> Result<String, RenderError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(content.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

fn render_url(
    endpoint: &str,
    diagram_type: DiagramType,
    format: OutputFormat,
    payload: &str,
) -> String {
    format!(
        "{}/{}/{}/{}",
        endpoint,
        diagram_type.as_str(),
        format.as_str(),
        payload
    )
}

fn transport_error(err: reqwest::Error) -> RenderError {
    if err.is_timeout() {
        RenderError::Timeout(REMOTE_REQUEST_TIMEOUT)
    } else {
        RenderError::Connection(err.to_string())
    }
}

#[async_trait]
impl DiagramBackend for RemoteHttpBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::RemoteHttp
    }

    async fn probe(&self) -> BackendCapability {
        BackendCapability {
            kind: BackendKind::RemoteHttp,
            available: true,
            supported_types: BTreeSet::from([
                DiagramType::Mermaid,
                DiagramType::Plantuml,
                DiagramType::Graphviz,
                DiagramType::Structurizr,
            ]),
            diagnostic: None,
        }
    }

    async fn render(&self, req: &RenderRequest) -> Result<RenderResult, RenderError> {
        let payload = encode_payload(&req.content)?;

        match self.request(req.diagram_type, OutputFormat::Svg, &payload).await {
            Ok(result) => Ok(result),
            Err(svg_error) => {
                // Format fallback: one PNG attempt after any SVG failure.
                // Not a transient-error retry, and when the fallback also
                // fails the *original* SVG error is the one surfaced, so a
                // syntax diagnostic is never masked by the PNG attempt.
                match self.request(req.diagram_type, OutputFormat::Png, &payload).await {
                    Ok(result) => Ok(result),
                    Err(_) => Err(svg_error),
                }
            }
        }
    }
}
