// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Monitor operations the agent runtime depends on.
//!
//! `MonitorClient` is the production implementation; tests use `FakeMonitor`.

use crate::error::MonitorApiError;
use async_trait::async_trait;
use serde_json::Value;
use swf_core::{
    ExecutionStatus, FastMonFile, FastMonFileRow, HeartbeatPayload, NewWorkflowDefinition,
    NewWorkflowExecution, RunState, SystemStateEvent, TfSlice, TfSliceRow, WorkflowDefinitionRow,
    WorkflowExecutionRow,
};

#[async_trait]
pub trait MonitorApi: Send + Sync {
    // -- best-effort --
    async fn send_heartbeat(&self, payload: &HeartbeatPayload) -> Result<(), MonitorApiError>;
    async fn post_system_event(&self, event: &SystemStateEvent) -> Result<(), MonitorApiError>;
    async fn ensure_namespace(&self, namespace: &str) -> Result<(), MonitorApiError>;

    // -- workflow-critical --
    async fn next_execution_sequence(&self, workflow_name: &str) -> Result<u64, MonitorApiError>;
    async fn count_executions(&self, workflow_name: &str) -> Result<u64, MonitorApiError>;
    async fn find_workflow_definition(
        &self,
        workflow_name: &str,
        version: &str,
    ) -> Result<Option<WorkflowDefinitionRow>, MonitorApiError>;
    async fn create_workflow_definition(
        &self,
        definition: &NewWorkflowDefinition,
    ) -> Result<WorkflowDefinitionRow, MonitorApiError>;
    async fn create_execution(
        &self,
        execution: &NewWorkflowExecution,
    ) -> Result<(), MonitorApiError>;
    async fn patch_execution(
        &self,
        execution_id: &str,
        status: ExecutionStatus,
        end_time: Option<String>,
    ) -> Result<(), MonitorApiError>;
    async fn get_execution(
        &self,
        execution_id: &str,
    ) -> Result<WorkflowExecutionRow, MonitorApiError>;
    async fn next_run_number(&self) -> Result<u64, MonitorApiError>;

    // -- run state (single writer per run) --
    async fn create_run_state(&self, state: &RunState) -> Result<(), MonitorApiError>;
    async fn get_run_state(&self, run_number: u64) -> Result<RunState, MonitorApiError>;
    async fn patch_run_state(&self, run_number: u64, patch: &Value)
        -> Result<(), MonitorApiError>;

    // -- slices and TF files --
    async fn create_tf_slice(&self, slice: &TfSlice) -> Result<TfSliceRow, MonitorApiError>;
    async fn find_tf_slice(
        &self,
        run_number: u64,
        slice_id: u32,
    ) -> Result<Option<TfSliceRow>, MonitorApiError>;
    async fn patch_tf_slice(&self, id: u64, patch: &Value) -> Result<(), MonitorApiError>;
    async fn create_fastmon_file(
        &self,
        file: &FastMonFile,
    ) -> Result<FastMonFileRow, MonitorApiError>;
}
