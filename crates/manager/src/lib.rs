// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! swf-manager: Per-user agent manager daemon.
//!
//! Listens on `/queue/agent_control.<username>` for testbed control
//! commands and owns the supervisord lifecycle of that user's agents.
//! Control-plane messages on the user-scoped queue are exempt from
//! namespace filtering.

pub mod commands;
pub mod manager;
pub mod supervisor;

pub use commands::ControlCommand;
pub use manager::{control_queue, ManagerAction, UserAgentManager};
pub use supervisor::{program_for, SupervisorControl, SupervisorError, SupervisordControl};
