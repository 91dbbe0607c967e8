// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

/// Default remote rendering service endpoint
pub const DEFAULT_REMOTE_ENDPOINT: &str = "https://kroki.io";
/// Default minimum spacing between remote render requests
pub const DEFAULT_REMOTE_RATE_LIMIT_MS: u64 = 500;
/// Default render cache capacity (entries)
pub const DEFAULT_CACHE_CAPACITY: usize = 64;
/// Default debounce interval for preview updates
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
/// Default worker pool size for batch export
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Validation ceiling for the debounce interval; anything above this makes
/// the preview feel broken rather than calm
pub const MAX_DEBOUNCE_MS: u64 = 10_000;
/// Validation ceiling for the remote rate limit
pub const MAX_REMOTE_RATE_LIMIT_MS: u64 = 60_000;

/// Per-request timeout for the remote rendering service
pub const REMOTE_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Hard timeout for a single containerized render
pub const CONTAINER_SINGLE_RENDER_TIMEOUT: Duration = Duration::from_secs(60);
/// Hard timeout for a whole-workspace containerized batch render
pub const CONTAINER_WORKSPACE_RENDER_TIMEOUT: Duration = Duration::from_secs(120);

/// Interpreter launched for the archive-based local renderer when no
/// explicit path is configured
pub const DEFAULT_INTERPRETER: &str = "java";
/// CLI tool for the Mermaid diagram family when no explicit path is
/// configured
pub const DEFAULT_MERMAID_CLI: &str = "mmdc";
/// Container runtime binary used for probing
pub const CONTAINER_RUNTIME: &str = "docker";
/// Default container name the orchestration script drives
pub const DEFAULT_CONTAINER_NAME: &str = "structurizr-cli";

/// Workspace-level configuration file, looked up at the workspace root
pub const WORKSPACE_CONFIG_FILE: &str = ".lightbox.yaml";
/// User-level configuration file, relative to the platform config dir
pub const USER_CONFIG_RELATIVE_PATH: &str = "lightbox/config.toml";
/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "LIGHTBOX_";
