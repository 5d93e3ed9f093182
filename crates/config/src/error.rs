// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration errors. All of these fail fast at startup.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("missing [{section}] section")]
    MissingSection { section: String },

    #[error("missing key '{key}' in [{section}]")]
    MissingKey { section: String, key: String },

    #[error("invalid [{section}] section: {source}")]
    Section {
        section: String,
        #[source]
        source: Box<toml::de::Error>,
    },

    #[error("{key} must be between {min} and {max} (got {value})")]
    InvalidRange {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },
}
