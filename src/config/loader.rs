// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration layer loading.
//!
//! Each layer is parsed into a sparse [`ConfigOverlay`] with every field
//! optional, and the resolver folds the overlays onto the built-in
//! defaults in precedence order. Three loaders live here: the user-level
//! TOML file, the workspace-level YAML file, and `LIGHTBOX_*` environment
//! variables.
//!
//! # Example (workspace `.lightbox.yaml`)
//! ```yaml
//! remote_endpoint: https://kroki.internal.example
//! debounce_ms: 150
//! structurizr_backend: container_cli
//! container:
//!   script_path: ./scripts/render-structurizr.sh
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::render::BackendKind;

/// One sparse configuration layer. Absent fields defer to lower layers.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ConfigOverlay {
    pub remote_endpoint: Option<String>,
    pub remote_rate_limit_ms: Option<u64>,
    pub cache_capacity: Option<usize>,
    pub debounce_ms: Option<u64>,
    pub batch_concurrency: Option<usize>,
    pub plantuml_backend: Option<BackendKind>,
    pub structurizr_backend: Option<BackendKind>,
    #[serde(default)]
    pub local_tools: LocalToolsOverlay,
    #[serde(default)]
    pub container: ContainerOverlay,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct LocalToolsOverlay {
    pub interpreter_path: Option<PathBuf>,
    pub archive_path: Option<PathBuf>,
    pub cli_path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ContainerOverlay {
    pub script_path: Option<PathBuf>,
    pub container_name: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Load the user-level TOML layer.
pub fn load_user_overlay(path: &Path) -> Result<ConfigOverlay, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Load the workspace-level YAML layer.
pub fn load_workspace_overlay(path: &Path) -> Result<ConfigOverlay, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Build the environment overlay from `LIGHTBOX_*` variables.
pub fn environment_overlay() -> Result<ConfigOverlay, ConfigError> {
    overlay_from_lookup(|name| std::env::var(name).ok())
}

/// Environment parsing against an injectable lookup, so tests never have
/// to mutate process-global state.
pub fn overlay_from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConfigOverlay, ConfigError> {
    let mut overlay = ConfigOverlay::default();

    overlay.remote_endpoint = lookup("LIGHTBOX_REMOTE_ENDPOINT");
    overlay.remote_rate_limit_ms =
        parse_env(&lookup, "LIGHTBOX_REMOTE_RATE_LIMIT_MS", "remote_rate_limit_ms")?;
    overlay.cache_capacity = parse_env(&lookup, "LIGHTBOX_CACHE_CAPACITY", "cache_capacity")?;
    overlay.debounce_ms = parse_env(&lookup, "LIGHTBOX_DEBOUNCE_MS", "debounce_ms")?;
    overlay.batch_concurrency =
        parse_env(&lookup, "LIGHTBOX_BATCH_CONCURRENCY", "batch_concurrency")?;
    overlay.plantuml_backend =
        parse_backend(&lookup, "LIGHTBOX_PLANTUML_BACKEND", "plantuml_backend")?;
    overlay.structurizr_backend =
        parse_backend(&lookup, "LIGHTBOX_STRUCTURIZR_BACKEND", "structurizr_backend")?;

    overlay.local_tools = LocalToolsOverlay {
        interpreter_path: lookup("LIGHTBOX_INTERPRETER_PATH").map(PathBuf::from),
        archive_path: lookup("LIGHTBOX_ARCHIVE_PATH").map(PathBuf::from),
        cli_path: lookup("LIGHTBOX_MERMAID_CLI_PATH").map(PathBuf::from),
    };
    overlay.container = ContainerOverlay {
        script_path: lookup("LIGHTBOX_CONTAINER_SCRIPT_PATH").map(PathBuf::from),
        container_name: lookup("LIGHTBOX_CONTAINER_NAME"),
        output_dir: lookup("LIGHTBOX_CONTAINER_OUTPUT_DIR").map(PathBuf::from),
    };

    Ok(overlay)
}

fn parse_env<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    field: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|e| ConfigError::InvalidValue {
            field,
            layer: "environment",
            detail: format!("'{}': {}", raw, e),
        }),
    }
}

fn parse_backend(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    field: &'static str,
) -> Result<Option<BackendKind>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(raw) => BackendKind::from_str(&raw)
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                field,
                layer: "environment",
                detail: e,
            }),
    }
}
