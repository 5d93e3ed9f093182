// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-queue command format.
//!
//! Unlike workflow messages, control commands use a `command` field; they
//! arrive only on the user-scoped queue and carry no namespace.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCommand {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_name: Option<String>,
    /// Destination for `status` / `ping` replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl ControlCommand {
    pub fn parse(body: &str) -> Option<Self> {
        match serde_json::from_str(body) {
            Ok(command) => Some(command),
            Err(e) => {
                tracing::warn!(error = %e, "dropping unparseable control message");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
