// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Merging of configuration layers into one resolved settings object.
//!
//! Four layers, lowest to highest precedence: built-in defaults, the
//! user-level TOML file, the workspace-level YAML file, and `LIGHTBOX_*`
//! environment variables. The product is a fully-populated
//! [`Configuration`] that is immutable for the life of a session and
//! shared as `Arc<Configuration>`; a reload produces a *new* value (and a
//! new backend registry and cache), never a mutation of a live one, so
//! concurrent readers can never observe a torn update.
//!
//! The system must function with zero configuration present: resolving an
//! empty overlay list yields a valid default configuration.

use std::path::{Path, PathBuf};

use url::Url;

use crate::config::consts::{
    DEFAULT_BATCH_CONCURRENCY, DEFAULT_CACHE_CAPACITY, DEFAULT_CONTAINER_NAME,
    DEFAULT_DEBOUNCE_MS, DEFAULT_REMOTE_ENDPOINT, DEFAULT_REMOTE_RATE_LIMIT_MS,
    MAX_DEBOUNCE_MS, MAX_REMOTE_RATE_LIMIT_MS, USER_CONFIG_RELATIVE_PATH, WORKSPACE_CONFIG_FILE,
};
use crate::config::loader::{
    environment_overlay, load_user_overlay, load_workspace_overlay, ConfigOverlay,
};
use crate::errors::ConfigError;
use crate::render::BackendKind;

/// Paths of the external tools the local-process backend drives. Any
/// `None` falls back to PATH discovery at probe time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocalToolPaths {
    pub interpreter_path: Option<PathBuf>,
    pub archive_path: Option<PathBuf>,
    pub cli_path: Option<PathBuf>,
}

/// Settings for the containerized-CLI backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSettings {
    pub script_path: Option<PathBuf>,
    pub container_name: String,
    /// Where the orchestration script writes its artifacts. `None` means
    /// the conventional `workspace/diagrams` directory beside the script.
    pub output_dir: Option<PathBuf>,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            script_path: None,
            container_name: DEFAULT_CONTAINER_NAME.to_string(),
            output_dir: None,
        }
    }
}

impl ContainerSettings {
    /// The directory the scan fallback watches for produced artifacts.
    pub fn effective_output_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.output_dir {
            return Some(dir.clone());
        }
        self.script_path
            .as_ref()
            .and_then(|script| script.parent())
            .map(|dir| dir.join("workspace").join("diagrams"))
    }
}

/// Resolved, fully-populated settings. Immutable per session.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub remote_endpoint: String,
    pub remote_rate_limit_ms: u64,
    pub local_tools: LocalToolPaths,
    pub container: ContainerSettings,
    pub cache_capacity: usize,
    pub debounce_ms: u64,
    pub batch_concurrency: usize,
    /// Which backend serves PlantUML sources (the extension table allows
    /// local-process or remote).
    pub plantuml_backend: BackendKind,
    /// Which backend serves Structurizr sources (remote or container).
    pub structurizr_backend: BackendKind,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            remote_endpoint: DEFAULT_REMOTE_ENDPOINT.to_string(),
            remote_rate_limit_ms: DEFAULT_REMOTE_RATE_LIMIT_MS,
            local_tools: LocalToolPaths::default(),
            container: ContainerSettings::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            plantuml_backend: BackendKind::LocalProcess,
            structurizr_backend: BackendKind::RemoteHttp,
        }
    }
}

/// Fold overlays onto the defaults, lowest precedence first, and validate
/// the result.
pub fn resolve(overlays: &[ConfigOverlay]) -> Result<Configuration, ConfigError> {
    let mut config = Configuration::default();
    for overlay in overlays {
        apply_overlay(&mut config, overlay);
    }
    validate(&config)?;
    Ok(config)
}

/// Resolve from the conventional locations: the platform user config
/// file, the workspace file under `workspace_root`, then the
/// environment. Missing files are simply skipped.
pub fn resolve_from_environment(
    workspace_root: Option<&Path>,
) -> Result<Configuration, ConfigError> {
    let mut overlays = Vec::new();

    if let Some(user_path) = user_config_path() {
        if user_path.is_file() {
            overlays.push(load_user_overlay(&user_path)?);
        }
    }
    if let Some(root) = workspace_root {
        let workspace_path = root.join(WORKSPACE_CONFIG_FILE);
        if workspace_path.is_file() {
            overlays.push(load_workspace_overlay(&workspace_path)?);
        }
    }
    overlays.push(environment_overlay()?);

    resolve(&overlays)
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(USER_CONFIG_RELATIVE_PATH))
}

fn apply_overlay(config: &mut Configuration, overlay: &ConfigOverlay) {
    if let Some(v) = &overlay.remote_endpoint {
        config.remote_endpoint = v.clone();
    }
    if let Some(v) = overlay.remote_rate_limit_ms {
        config.remote_rate_limit_ms = v;
    }
    if let Some(v) = overlay.cache_capacity {
        config.cache_capacity = v;
    }
    if let Some(v) = overlay.debounce_ms {
        config.debounce_ms = v;
    }
    if let Some(v) = overlay.batch_concurrency {
        config.batch_concurrency = v;
    }
    if let Some(v) = overlay.plantuml_backend {
        config.plantuml_backend = v;
    }
    if let Some(v) = overlay.structurizr_backend {
        config.structurizr_backend = v;
    }

    if let Some(v) = &overlay.local_tools.interpreter_path {
        config.local_tools.interpreter_path = Some(v.clone());
    }
    if let Some(v) = &overlay.local_tools.archive_path {
        config.local_tools.archive_path = Some(v.clone());
    }
    if let Some(v) = &overlay.local_tools.cli_path {
        config.local_tools.cli_path = Some(v.clone());
    }

    if let Some(v) = &overlay.container.script_path {
        config.container.script_path = Some(v.clone());
    }
    if let Some(v) = &overlay.container.container_name {
        config.container.container_name = v.clone();
    }
    if let Some(v) = &overlay.container.output_dir {
        config.container.output_dir = Some(v.clone());
    }
}

fn validate(config: &Configuration) -> Result<(), ConfigError> {
    if config.cache_capacity == 0 {
        return Err(ConfigError::InvalidValue {
            field: "cache_capacity",
            layer: "resolved",
            detail: "must be at least 1".to_string(),
        });
    }
    if config.batch_concurrency == 0 {
        return Err(ConfigError::InvalidValue {
            field: "batch_concurrency",
            layer: "resolved",
            detail: "must be at least 1".to_string(),
        });
    }
    if config.debounce_ms > MAX_DEBOUNCE_MS {
        return Err(ConfigError::InvalidValue {
            field: "debounce_ms",
            layer: "resolved",
            detail: format!("must be at most {}", MAX_DEBOUNCE_MS),
        });
    }
    if config.remote_rate_limit_ms > MAX_REMOTE_RATE_LIMIT_MS {
        return Err(ConfigError::InvalidValue {
            field: "remote_rate_limit_ms",
            layer: "resolved",
            detail: format!("must be at most {}", MAX_REMOTE_RATE_LIMIT_MS),
        });
    }
    match Url::parse(&config.remote_endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => {
            return Err(ConfigError::InvalidValue {
                field: "remote_endpoint",
                layer: "resolved",
                detail: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Err(e) => {
            return Err(ConfigError::InvalidValue {
                field: "remote_endpoint",
                layer: "resolved",
                detail: e.to_string(),
            });
        }
    }
    if config.plantuml_backend == BackendKind::ContainerCli {
        return Err(ConfigError::InvalidValue {
            field: "plantuml_backend",
            layer: "resolved",
            detail: "plantuml renders via local_process or remote_http".to_string(),
        });
    }
    if config.structurizr_backend == BackendKind::LocalProcess {
        return Err(ConfigError::InvalidValue {
            field: "structurizr_backend",
            layer: "resolved",
            detail: "structurizr renders via remote_http or container_cli".to_string(),
        });
    }
    Ok(())
}
