// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod resolver;

pub mod consts;

pub use loader::{
    environment_overlay, load_user_overlay, load_workspace_overlay, overlay_from_lookup,
    ConfigOverlay, ContainerOverlay, LocalToolsOverlay,
};
pub use resolver::{
    resolve, resolve_from_environment, Configuration, ContainerSettings, LocalToolPaths,
};
