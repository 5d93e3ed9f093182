// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent runtime errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("transport error: {0}")]
    Transport(#[from] swf_broker::TransportError),

    #[error("monitor error: {0}")]
    Monitor(#[from] swf_monitor::MonitorApiError),

    #[error("broker connection lost and not recovered")]
    ConnectionLost,

    #[error("{0}")]
    Other(String),
}
