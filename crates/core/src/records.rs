// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor record types.
//!
//! These mirror the Monitor's JSON resources; the Monitor owns persistence
//! and retention, agents only create and patch rows.

use crate::state::OperationalState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Heartbeat upsert payload for `systemagents/heartbeat/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    pub instance_name: String,
    pub agent_type: String,
    pub status: String,
    pub operational_state: OperationalState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub pid: u32,
    pub hostname: String,
    pub description: String,
    pub mq_connected: bool,
}

/// Run lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Initializing,
    Physics,
    Completed,
}

/// Per-run state row, created by the workflow runner and mutated only by the
/// single agent owning the run (slice counters by fast-processing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub run_number: u64,
    pub phase: RunPhase,
    pub state: String,
    pub substate: Option<String>,
    pub target_worker_count: u32,
    pub active_worker_count: u32,
    pub stf_samples_received: u64,
    pub slices_created: u64,
    pub slices_queued: u64,
    pub slices_processing: u64,
    pub slices_completed: u64,
    pub slices_failed: u64,
    pub state_changed_at: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// TF slice record; `slice_id` is unique per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfSlice {
    pub slice_id: u32,
    pub tf_first: u32,
    pub tf_last: u32,
    pub tf_count: u32,
    pub tf_filename: String,
    pub stf_filename: String,
    pub run_number: u64,
    pub status: SliceStatus,
    pub retries: u32,
    #[serde(default)]
    pub metadata: Value,
}

/// TF slice row as returned by the Monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfSliceRow {
    pub id: u64,
    #[serde(flatten)]
    pub slice: TfSlice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TfFileStatus {
    Registered,
    Processing,
    Processed,
    Failed,
    Done,
}

/// Fast-monitoring TF file record for `fastmon-files/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastMonFile {
    /// Parent STF filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stf_file: Option<String>,
    pub tf_filename: String,
    pub file_size_bytes: u64,
    pub status: TfFileStatus,
    #[serde(default)]
    pub metadata: Value,
}

/// TF file row as returned by the Monitor. Older deployments return `id`,
/// newer ones `tf_file_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastMonFileRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tf_file_id: Option<u64>,
    #[serde(flatten)]
    pub file: FastMonFile,
}

impl FastMonFileRow {
    pub fn file_id(&self) -> Option<u64> {
        self.tf_file_id.or(self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Terminated,
    Failed,
}

impl ExecutionStatus {
    /// Executions only ever leave `running`, and only once.
    pub fn can_transition_to(self, next: ExecutionStatus) -> bool {
        self == ExecutionStatus::Running && next != ExecutionStatus::Running
    }
}

/// Workflow definition creation payload. Definitions are immutable once
/// created; `(workflow_name, version)` is the uniqueness key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkflowDefinition {
    pub workflow_name: String,
    pub version: String,
    pub workflow_type: String,
    pub definition: String,
    pub parameter_values: Value,
    pub created_by: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinitionRow {
    pub id: u64,
    #[serde(flatten)]
    pub definition: NewWorkflowDefinition,
}

/// Workflow execution creation payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkflowExecution {
    pub execution_id: String,
    pub workflow_definition: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub status: ExecutionStatus,
    pub executed_by: String,
    pub start_time: String,
    pub parameter_values: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecutionRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub execution_id: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub parameter_values: Value,
}

/// Audit event appended to `system-state-events/`; best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStateEvent {
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_number: Option<u64>,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substate: Option<String>,
    pub event_data: Value,
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
