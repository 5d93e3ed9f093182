// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent operational state and instance naming.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state reported with every heartbeat.
///
/// `EXITED` is reported before broker disconnect on clean shutdown; agents
/// with no heartbeat for five minutes are considered stale by the Monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationalState {
    Ready,
    Processing,
    Warning,
    Exited,
}

impl OperationalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationalState::Ready => "READY",
            OperationalState::Processing => "PROCESSING",
            OperationalState::Warning => "WARNING",
            OperationalState::Exited => "EXITED",
        }
    }
}

impl fmt::Display for OperationalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic instance name: `<agent_type_lower>-agent-<suffix>`.
pub fn agent_instance_name(agent_type: &str, suffix: &str) -> String {
    format!("{}-agent-{}", agent_type.to_lowercase(), suffix)
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
