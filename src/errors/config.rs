// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while loading or resolving configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A configuration file exists but could not be read
    Unreadable {
        /// The file that failed to read
        path: PathBuf,
        /// The underlying I/O failure
        detail: String,
    },
    /// A configuration file could not be parsed
    Parse {
        /// The file that failed to parse
        path: PathBuf,
        /// Parser diagnostic
        detail: String,
    },
    /// A resolved value failed validation
    InvalidValue {
        /// The offending field
        field: &'static str,
        /// Which layer supplied the value (defaults, user, workspace, environment)
        layer: &'static str,
        /// What was wrong with it
        detail: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Unreadable { path, detail } => {
                write!(
                    f,
                    "could not read config file '{}': {}",
                    path.display(),
                    detail
                )
            }
            ConfigError::Parse { path, detail } => {
                write!(
                    f,
                    "could not parse config file '{}': {}",
                    path.display(),
                    detail
                )
            }
            ConfigError::InvalidValue {
                field,
                layer,
                detail,
            } => {
                write!(
                    f,
                    "invalid configuration value for '{}' (from {} layer): {}",
                    field, layer, detail
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}
