// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor API errors.
//!
//! Whether a failure aborts the workflow or is logged and swallowed is the
//! caller's decision; the criticality split lives at the call sites.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("monitor returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("monitor response missing field '{0}'")]
    MissingField(&'static str),

    #[error("no {resource} found for {key}")]
    NotFound {
        resource: &'static str,
        key: String,
    },

    #[error("failed to build http client: {0}")]
    Client(String),
}

impl MonitorApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            MonitorApiError::Status { status, .. } => Some(*status),
            MonitorApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
