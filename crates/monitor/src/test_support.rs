// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory Monitor for tests.
//!
//! Implements the same contracts the real Monitor provides: immutable
//! workflow definitions, per-workflow execution sequences, a run-number
//! counter, and patchable run-state and slice rows.

use crate::api::MonitorApi;
use crate::error::MonitorApiError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use swf_core::{
    ExecutionStatus, FastMonFile, FastMonFileRow, HeartbeatPayload, NewWorkflowDefinition,
    NewWorkflowExecution, RunState, SystemStateEvent, TfSlice, TfSliceRow, WorkflowDefinitionRow,
    WorkflowExecutionRow,
};

#[derive(Default)]
struct State {
    heartbeats: Vec<HeartbeatPayload>,
    events: Vec<SystemStateEvent>,
    namespaces: Vec<String>,
    definitions: Vec<WorkflowDefinitionRow>,
    executions: Vec<WorkflowExecutionRow>,
    execution_patches: Vec<(String, ExecutionStatus, Option<String>)>,
    sequences: HashMap<String, u64>,
    next_run_number: u64,
    run_states: HashMap<u64, RunState>,
    slices: Vec<TfSliceRow>,
    slice_patches: Vec<(u64, Value)>,
    fastmon_files: Vec<FastMonFileRow>,
    next_row_id: u64,
    fail_sequence_endpoint: bool,
    fail_executions_endpoint: bool,
    fail_slice_creation: bool,
}

/// Shared, cloneable fake; clones observe the same state.
#[derive(Clone, Default)]
pub struct FakeMonitor {
    state: Arc<Mutex<State>>,
}

fn unavailable() -> MonitorApiError {
    MonitorApiError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

/// Shallow-merge a JSON patch into a serializable record.
fn apply_patch<T: serde::Serialize + serde::de::DeserializeOwned>(
    record: &T,
    patch: &Value,
) -> Option<T> {
    let mut value = serde_json::to_value(record).ok()?;
    if let (Some(target), Some(fields)) = (value.as_object_mut(), patch.as_object()) {
        for (key, v) in fields {
            target.insert(key.clone(), v.clone());
        }
    }
    serde_json::from_value(value).ok()
}

impl FakeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    // -- canned data and failure injection --

    pub fn set_fail_sequence_endpoint(&self, fail: bool) {
        self.state.lock().fail_sequence_endpoint = fail;
    }

    pub fn set_fail_executions_endpoint(&self, fail: bool) {
        self.state.lock().fail_executions_endpoint = fail;
    }

    pub fn set_fail_slice_creation(&self, fail: bool) {
        self.state.lock().fail_slice_creation = fail;
    }

    /// Seed an execution row (e.g. for mid-run parameter fetches).
    pub fn insert_execution(&self, execution_id: &str, parameter_values: Value) {
        self.state.lock().executions.push(WorkflowExecutionRow {
            id: None,
            execution_id: execution_id.to_string(),
            status: ExecutionStatus::Running,
            end_time: None,
            parameter_values,
        });
    }

    /// Seed a slice row, returning its id.
    pub fn insert_slice(&self, slice: TfSlice) -> u64 {
        let mut state = self.state.lock();
        state.next_row_id += 1;
        let id = state.next_row_id;
        state.slices.push(TfSliceRow { id, slice });
        id
    }

    /// Seed a run-state row.
    pub fn insert_run_state(&self, state_row: RunState) {
        self.state
            .lock()
            .run_states
            .insert(state_row.run_number, state_row);
    }

    // -- observations --

    pub fn heartbeats(&self) -> Vec<HeartbeatPayload> {
        self.state.lock().heartbeats.clone()
    }

    pub fn events(&self) -> Vec<SystemStateEvent> {
        self.state.lock().events.clone()
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.state.lock().namespaces.clone()
    }

    pub fn definitions(&self) -> Vec<WorkflowDefinitionRow> {
        self.state.lock().definitions.clone()
    }

    pub fn executions(&self) -> Vec<WorkflowExecutionRow> {
        self.state.lock().executions.clone()
    }

    pub fn execution_patches(&self) -> Vec<(String, ExecutionStatus, Option<String>)> {
        self.state.lock().execution_patches.clone()
    }

    pub fn run_state(&self, run_number: u64) -> Option<RunState> {
        self.state.lock().run_states.get(&run_number).cloned()
    }

    pub fn slices(&self) -> Vec<TfSliceRow> {
        self.state.lock().slices.clone()
    }

    pub fn slice_patches(&self) -> Vec<(u64, Value)> {
        self.state.lock().slice_patches.clone()
    }

    pub fn fastmon_files(&self) -> Vec<FastMonFileRow> {
        self.state.lock().fastmon_files.clone()
    }
}

#[async_trait]
impl MonitorApi for FakeMonitor {
    async fn send_heartbeat(&self, payload: &HeartbeatPayload) -> Result<(), MonitorApiError> {
        self.state.lock().heartbeats.push(payload.clone());
        Ok(())
    }

    async fn post_system_event(&self, event: &SystemStateEvent) -> Result<(), MonitorApiError> {
        self.state.lock().events.push(event.clone());
        Ok(())
    }

    async fn ensure_namespace(&self, namespace: &str) -> Result<(), MonitorApiError> {
        let mut state = self.state.lock();
        if !state.namespaces.iter().any(|ns| ns == namespace) {
            state.namespaces.push(namespace.to_string());
        }
        Ok(())
    }

    async fn next_execution_sequence(&self, workflow_name: &str) -> Result<u64, MonitorApiError> {
        let mut state = self.state.lock();
        if state.fail_sequence_endpoint {
            return Err(unavailable());
        }
        let seq = state
            .sequences
            .entry(workflow_name.to_string())
            .or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn count_executions(&self, workflow_name: &str) -> Result<u64, MonitorApiError> {
        let state = self.state.lock();
        if state.fail_executions_endpoint {
            return Err(unavailable());
        }
        let prefix = format!("{workflow_name}-");
        Ok(state
            .executions
            .iter()
            .filter(|e| e.execution_id.starts_with(&prefix))
            .count() as u64)
    }

    async fn find_workflow_definition(
        &self,
        workflow_name: &str,
        version: &str,
    ) -> Result<Option<WorkflowDefinitionRow>, MonitorApiError> {
        Ok(self
            .state
            .lock()
            .definitions
            .iter()
            .find(|d| {
                d.definition.workflow_name == workflow_name && d.definition.version == version
            })
            .cloned())
    }

    async fn create_workflow_definition(
        &self,
        definition: &NewWorkflowDefinition,
    ) -> Result<WorkflowDefinitionRow, MonitorApiError> {
        let mut state = self.state.lock();
        // Uniqueness on (workflow_name, version), as the Monitor enforces.
        if state.definitions.iter().any(|d| {
            d.definition.workflow_name == definition.workflow_name
                && d.definition.version == definition.version
        }) {
            return Err(MonitorApiError::Status {
                status: 400,
                body: "definition already exists".to_string(),
            });
        }
        state.next_row_id += 1;
        let row = WorkflowDefinitionRow {
            id: state.next_row_id,
            definition: definition.clone(),
        };
        state.definitions.push(row.clone());
        Ok(row)
    }

    async fn create_execution(
        &self,
        execution: &NewWorkflowExecution,
    ) -> Result<(), MonitorApiError> {
        let mut state = self.state.lock();
        if state.fail_executions_endpoint {
            return Err(unavailable());
        }
        state.next_row_id += 1;
        let row = WorkflowExecutionRow {
            id: Some(state.next_row_id),
            execution_id: execution.execution_id.clone(),
            status: execution.status,
            end_time: None,
            parameter_values: execution.parameter_values.clone(),
        };
        state.executions.push(row);
        Ok(())
    }

    async fn patch_execution(
        &self,
        execution_id: &str,
        status: ExecutionStatus,
        end_time: Option<String>,
    ) -> Result<(), MonitorApiError> {
        let mut state = self.state.lock();
        state
            .execution_patches
            .push((execution_id.to_string(), status, end_time.clone()));
        if let Some(row) = state
            .executions
            .iter_mut()
            .find(|e| e.execution_id == execution_id)
        {
            row.status = status;
            row.end_time = end_time;
        }
        Ok(())
    }

    async fn get_execution(
        &self,
        execution_id: &str,
    ) -> Result<WorkflowExecutionRow, MonitorApiError> {
        self.state
            .lock()
            .executions
            .iter()
            .find(|e| e.execution_id == execution_id)
            .cloned()
            .ok_or(MonitorApiError::NotFound {
                resource: "workflow execution",
                key: execution_id.to_string(),
            })
    }

    async fn next_run_number(&self) -> Result<u64, MonitorApiError> {
        let mut state = self.state.lock();
        state.next_run_number += 1;
        Ok(state.next_run_number)
    }

    async fn create_run_state(&self, run_state: &RunState) -> Result<(), MonitorApiError> {
        self.state
            .lock()
            .run_states
            .insert(run_state.run_number, run_state.clone());
        Ok(())
    }

    async fn get_run_state(&self, run_number: u64) -> Result<RunState, MonitorApiError> {
        self.state
            .lock()
            .run_states
            .get(&run_number)
            .cloned()
            .ok_or(MonitorApiError::NotFound {
                resource: "run state",
                key: run_number.to_string(),
            })
    }

    async fn patch_run_state(
        &self,
        run_number: u64,
        patch: &Value,
    ) -> Result<(), MonitorApiError> {
        let mut state = self.state.lock();
        let Some(existing) = state.run_states.get(&run_number) else {
            return Err(MonitorApiError::NotFound {
                resource: "run state",
                key: run_number.to_string(),
            });
        };
        if let Some(updated) = apply_patch(existing, patch) {
            state.run_states.insert(run_number, updated);
        }
        Ok(())
    }

    async fn create_tf_slice(&self, slice: &TfSlice) -> Result<TfSliceRow, MonitorApiError> {
        let mut state = self.state.lock();
        if state.fail_slice_creation {
            return Err(unavailable());
        }
        state.next_row_id += 1;
        let row = TfSliceRow {
            id: state.next_row_id,
            slice: slice.clone(),
        };
        state.slices.push(row.clone());
        Ok(row)
    }

    async fn find_tf_slice(
        &self,
        run_number: u64,
        slice_id: u32,
    ) -> Result<Option<TfSliceRow>, MonitorApiError> {
        Ok(self
            .state
            .lock()
            .slices
            .iter()
            .find(|row| row.slice.run_number == run_number && row.slice.slice_id == slice_id)
            .cloned())
    }

    async fn patch_tf_slice(&self, id: u64, patch: &Value) -> Result<(), MonitorApiError> {
        let mut state = self.state.lock();
        state.slice_patches.push((id, patch.clone()));
        let Some(index) = state.slices.iter().position(|row| row.id == id) else {
            return Err(MonitorApiError::NotFound {
                resource: "tf slice",
                key: id.to_string(),
            });
        };
        if let Some(updated) = apply_patch(&state.slices[index].slice, patch) {
            state.slices[index].slice = updated;
        }
        Ok(())
    }

    async fn create_fastmon_file(
        &self,
        file: &FastMonFile,
    ) -> Result<FastMonFileRow, MonitorApiError> {
        let mut state = self.state.lock();
        state.next_row_id += 1;
        let row = FastMonFileRow {
            id: Some(state.next_row_id),
            tf_file_id: Some(state.next_row_id),
            file: file.clone(),
        };
        state.fastmon_files.push(row.clone());
        Ok(row)
    }
}

#[cfg(test)]
#[path = "test_support_tests.rs"]
mod tests;
