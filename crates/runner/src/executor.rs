// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow-executor capability and the compiled registry.
//!
//! The source system loaded executor code at run time; here each workflow is
//! a compiled implementation registered by name. The stepping contract is
//! unchanged: `step` performs one simulation event's side effects and yields
//! the wait until the next one, so the driver can observe the stop flag
//! between events.

use crate::error::WorkflowError;
use crate::sim::SimClock;
use crate::workflows;
use async_trait::async_trait;
use std::sync::Arc;
use swf_broker::{broadcast_headers, Publisher};
use swf_core::{Message, Namespace};
use swf_monitor::MonitorApi;
use tracing::{info, warn};

/// Broadcast topic every run-aware agent subscribes to.
pub const BROADCAST_TOPIC: &str = "/topic/epictopic";

/// One simulation event's outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Wait this many simulated seconds before the next event.
    Wait(f64),
    /// The workflow process finished.
    Done,
}

/// Everything an executor touches while running.
pub struct WorkflowEnv {
    pub publisher: Arc<dyn Publisher>,
    pub monitor: Arc<dyn MonitorApi>,
    pub namespace: Namespace,
    pub execution_id: String,
    pub clock: SimClock,
}

impl WorkflowEnv {
    pub fn tick(&self) -> f64 {
        self.clock.now()
    }

    /// Broadcast a lifecycle message. Publish failures are logged and
    /// swallowed: the broker is best-effort for status broadcasts.
    pub async fn broadcast(&self, message: &Message) {
        let headers = broadcast_headers(
            message.msg_type(),
            self.namespace.as_str(),
            message.run_id().unwrap_or(0),
        );
        let body = match serde_json::to_value(message) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to encode broadcast");
                return;
            }
        };
        match self
            .publisher
            .publish(BROADCAST_TOPIC, body, &headers)
            .await
        {
            Ok(()) => info!(
                msg_type = message.msg_type(),
                run_id = message.run_id(),
                execution_id = %self.execution_id,
                simulation_tick = self.tick(),
                "broadcast"
            ),
            Err(e) => warn!(
                msg_type = message.msg_type(),
                error = %e,
                "broadcast failed, continuing"
            ),
        }
    }
}

/// A compiled workflow implementation.
#[async_trait]
pub trait WorkflowExecutor: Send {
    /// Registered in the Monitor as the immutable definition body.
    fn definition(&self) -> &'static str;

    /// Perform the next simulation event and yield the wait before the one
    /// after it. Called once more after each wait completes.
    async fn step(&mut self, env: &mut WorkflowEnv) -> Result<Step, WorkflowError>;
}

/// Instantiate the implementation registered under `workflow_name`.
pub fn create_executor(
    workflow_name: &str,
    config: &toml::Table,
) -> Result<Box<dyn WorkflowExecutor>, WorkflowError> {
    match workflow_name {
        "stf_datataking" => Ok(Box::new(workflows::stf_datataking::DaqExecutor::from_config(config)?)),
        "fast_processing" => Ok(Box::new(
            workflows::fast_processing::FastProcessingExecutor::from_config(config)?,
        )),
        other => Err(WorkflowError::UnknownWorkflow(other.to_string())),
    }
}
