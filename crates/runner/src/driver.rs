// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The stepping loop.
//!
//! Between simulation events the driver observes the cooperative stop flag,
//! so stop latency is bounded by the inter-event wait. There is no hard
//! kill: an executor that never yields would run to completion.

use crate::error::WorkflowError;
use crate::executor::{Step, WorkflowEnv, WorkflowExecutor};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The workflow process finished (or the duration limit was reached).
    Completed,
    /// The stop flag was observed between events.
    Stopped,
}

/// Drive one workflow to completion, stop, or its duration limit.
///
/// `duration_limit` bounds the simulation clock when positive; zero means
/// unbounded.
pub async fn drive(
    executor: &mut dyn WorkflowExecutor,
    env: &mut WorkflowEnv,
    stop: &CancellationToken,
    duration_limit: f64,
) -> Result<RunOutcome, WorkflowError> {
    loop {
        if stop.is_cancelled() {
            info!(execution_id = %env.execution_id, "stop requested, ending simulation");
            return Ok(RunOutcome::Stopped);
        }
        if duration_limit > 0.0 && env.clock.now() >= duration_limit {
            info!(
                execution_id = %env.execution_id,
                limit = duration_limit,
                "duration limit reached"
            );
            return Ok(RunOutcome::Completed);
        }
        match executor.step(env).await? {
            Step::Done => return Ok(RunOutcome::Completed),
            Step::Wait(seconds) => env.clock.wait(seconds).await,
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
