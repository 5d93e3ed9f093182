// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution identity, definition registration, and execution records.

use crate::driver::RunOutcome;
use crate::error::WorkflowError;
use serde_json::Value;
use std::sync::Arc;
use swf_config::FastProcessingParams;
use swf_core::{
    now_iso, ExecutionStatus, NewWorkflowDefinition, NewWorkflowExecution, RunPhase, RunState,
    WorkflowDefinitionRow,
};
use swf_monitor::MonitorApi;
use tracing::{info, warn};

/// Executing user, for execution ids and `created_by` fields.
pub fn username() -> String {
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

/// Deploy-time git metadata, recorded with execution parameter values when
/// available.
fn git_version() -> Option<Value> {
    let commit = std::env::var("SWF_GIT_COMMIT").ok()?;
    let mut version = serde_json::Map::new();
    version.insert("commit".to_string(), Value::String(commit));
    if let Ok(branch) = std::env::var("SWF_GIT_BRANCH") {
        version.insert("branch".to_string(), Value::String(branch));
    }
    Some(Value::Object(version))
}

/// Allocate the next execution id: `<workflow_name>-<username>-<NNNN>`.
///
/// The persistent-state endpoint is authoritative; when it fails, the
/// fallback counts existing executions. There is no random fallback — if
/// both fail the workflow aborts.
pub async fn allocate_execution_id(
    monitor: &Arc<dyn MonitorApi>,
    workflow_name: &str,
    executed_by: &str,
) -> Result<String, WorkflowError> {
    let sequence = match monitor.next_execution_sequence(workflow_name).await {
        Ok(sequence) => sequence,
        Err(e) => {
            warn!(workflow_name, error = %e, "persistent state API failed, counting executions");
            match monitor.count_executions(workflow_name).await {
                Ok(count) => count + 1,
                Err(e) => {
                    return Err(WorkflowError::ExecutionId(format!(
                        "both id endpoints unavailable: {e}"
                    )));
                }
            }
        }
    };
    Ok(format!("{workflow_name}-{executed_by}-{sequence:04}"))
}

/// Register the workflow definition, or reuse it untouched when the
/// `(workflow_name, version)` key already exists. Definitions are immutable:
/// executions may already reference the stored code.
pub async fn register_definition(
    monitor: &Arc<dyn MonitorApi>,
    workflow_name: &str,
    version: &str,
    definition: &str,
    parameter_values: Value,
    executed_by: &str,
) -> Result<WorkflowDefinitionRow, WorkflowError> {
    if let Some(existing) = monitor
        .find_workflow_definition(workflow_name, version)
        .await
        .map_err(|e| WorkflowError::DefinitionRegistration(e.to_string()))?
    {
        info!(workflow_name, version, "reusing existing workflow definition");
        return Ok(existing);
    }

    let new_definition = NewWorkflowDefinition {
        workflow_name: workflow_name.to_string(),
        version: version.to_string(),
        workflow_type: "simulation".to_string(),
        definition: definition.to_string(),
        parameter_values,
        created_by: executed_by.to_string(),
        created_at: now_iso(),
    };
    monitor
        .create_workflow_definition(&new_definition)
        .await
        .map_err(|e| WorkflowError::DefinitionRegistration(e.to_string()))
}

/// Create the execution record with the full merged config for auditability.
/// The namespace row is upserted first; that upsert is best-effort.
pub async fn create_execution_record(
    monitor: &Arc<dyn MonitorApi>,
    execution_id: &str,
    workflow_definition: u64,
    namespace: Option<&str>,
    config: Value,
    executed_by: &str,
) -> Result<(), WorkflowError> {
    if let Some(namespace) = namespace {
        if let Err(e) = monitor.ensure_namespace(namespace).await {
            warn!(namespace, error = %e, "ensure_namespace failed, continuing");
        }
    }

    let mut parameter_values = config;
    if let (Some(map), Some(version)) = (parameter_values.as_object_mut(), git_version()) {
        map.insert("git_version".to_string(), version);
    }

    monitor
        .create_execution(&NewWorkflowExecution {
            execution_id: execution_id.to_string(),
            workflow_definition,
            namespace: namespace.map(str::to_string),
            status: ExecutionStatus::Running,
            executed_by: executed_by.to_string(),
            start_time: now_iso(),
            parameter_values,
        })
        .await?;
    Ok(())
}

/// Terminal status for a finished drive.
pub fn outcome_status(outcome: RunOutcome) -> ExecutionStatus {
    match outcome {
        RunOutcome::Completed => ExecutionStatus::Completed,
        RunOutcome::Stopped => ExecutionStatus::Terminated,
    }
}

/// PATCH the execution's terminal status. `end_time` is recorded for
/// completed runs.
pub async fn finish_execution(
    monitor: &Arc<dyn MonitorApi>,
    execution_id: &str,
    status: ExecutionStatus,
) {
    let end_time = (status == ExecutionStatus::Completed).then(now_iso);
    if let Err(e) = monitor.patch_execution(execution_id, status, end_time).await {
        warn!(execution_id, error = %e, "failed to update execution status");
    }
}

/// The run-state row the runner creates before the run becomes imminent.
pub fn initial_run_state(
    run_number: u64,
    execution_id: &str,
    fast_processing: &FastProcessingParams,
) -> RunState {
    RunState {
        run_number,
        phase: RunPhase::Initializing,
        state: "imminent".to_string(),
        substate: Some("preparing".to_string()),
        target_worker_count: fast_processing.target_worker_count,
        active_worker_count: 0,
        stf_samples_received: 0,
        slices_created: 0,
        slices_queued: 0,
        slices_processing: 0,
        slices_completed: 0,
        slices_failed: 0,
        state_changed_at: now_iso(),
        metadata: serde_json::json!({
            "execution_id": execution_id,
            "stf_sampling_rate": fast_processing.stf_sampling_rate,
            "slices_per_sample": fast_processing.slices_per_sample,
        }),
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
