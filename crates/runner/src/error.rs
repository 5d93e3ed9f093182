// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow execution errors.
//!
//! All of these are fatal to the affected workflow (the execution is marked
//! `failed`), never to the runner agent itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No compiled workflow implementation registered under this name.
    #[error("no workflow implementation registered for '{0}'")]
    UnknownWorkflow(String),

    #[error("config error: {0}")]
    Config(#[from] swf_config::ConfigError),

    #[error("monitor error: {0}")]
    Monitor(#[from] swf_monitor::MonitorApiError),

    #[error("cannot allocate execution id: {0}")]
    ExecutionId(String),

    #[error("failed to register workflow definition: {0}")]
    DefinitionRegistration(String),
}
