// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker message envelope.
//!
//! Serializes with `{"msg_type": "name", ...fields}` format. Unknown type
//! tags deserialize to `Unknown` so new message kinds never fail dispatch.
//! Lifecycle broadcasts produced by a workflow executor additionally carry
//! `run_id`, `execution_id`, and `simulation_tick`.

use crate::namespace::Namespace;
use crate::now_iso;
use crate::slice::SliceResultContent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_true() -> bool {
    true
}

/// Messages exchanged on the broadcast topic, the workflow-control queue,
/// and the transformer-results queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg_type", rename_all = "snake_case")]
pub enum Message {
    // -- run lifecycle (DAQ workflow → broadcast topic) --
    RunImminent {
        #[serde(default)]
        namespace: String,
        #[serde(default)]
        execution_id: String,
        #[serde(default)]
        run_id: u64,
        #[serde(default)]
        timestamp: String,
        #[serde(default)]
        simulation_tick: f64,
        #[serde(default)]
        state: String,
        #[serde(default)]
        substate: String,
        // Executor-specific worker sizing, set by the fast-processing workflow.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_worker_count: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slices_per_sample: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stf_rate: Option<f64>,
    },

    StartRun {
        #[serde(default)]
        namespace: String,
        #[serde(default)]
        execution_id: String,
        #[serde(default)]
        run_id: u64,
        #[serde(default)]
        timestamp: String,
        #[serde(default)]
        simulation_tick: f64,
        #[serde(default)]
        state: String,
        #[serde(default)]
        substate: String,
    },

    PauseRun {
        #[serde(default)]
        namespace: String,
        #[serde(default)]
        execution_id: String,
        #[serde(default)]
        run_id: u64,
        #[serde(default)]
        timestamp: String,
        #[serde(default)]
        simulation_tick: f64,
        #[serde(default)]
        state: String,
        #[serde(default)]
        substate: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    ResumeRun {
        #[serde(default)]
        namespace: String,
        #[serde(default)]
        execution_id: String,
        #[serde(default)]
        run_id: u64,
        #[serde(default)]
        timestamp: String,
        #[serde(default)]
        simulation_tick: f64,
        #[serde(default)]
        state: String,
        #[serde(default)]
        substate: String,
    },

    EndRun {
        #[serde(default)]
        namespace: String,
        #[serde(default)]
        execution_id: String,
        #[serde(default)]
        run_id: u64,
        #[serde(default)]
        timestamp: String,
        #[serde(default)]
        simulation_tick: f64,
        /// Set by the DAQ workflow.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_stf_files: Option<u64>,
        /// Set by the fast-processing pipeline.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_tf_files_received: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_slices_created: Option<u64>,
    },

    // -- data flow --
    StfGen {
        #[serde(default)]
        namespace: String,
        #[serde(default)]
        execution_id: String,
        #[serde(default)]
        run_id: u64,
        filename: String,
        #[serde(default)]
        sequence: u64,
        #[serde(default)]
        timestamp: String,
        #[serde(default)]
        simulation_tick: f64,
        #[serde(default)]
        state: String,
        #[serde(default)]
        substate: String,
    },

    /// STF metadata as delivered to the fast-monitoring agent.
    StfReady {
        #[serde(default)]
        namespace: String,
        filename: String,
        #[serde(default)]
        size_bytes: u64,
        #[serde(default)]
        run_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution_id: Option<String>,
        #[serde(default)]
        state: String,
        #[serde(default)]
        substate: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<String>,
    },

    /// TF record announcement from the fast-monitoring agent.
    TfFileRegistered {
        #[serde(default)]
        namespace: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        processed_by: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tf_file_id: Option<u64>,
        tf_filename: String,
        #[serde(default)]
        file_size_bytes: u64,
        #[serde(default)]
        stf_filename: String,
        #[serde(default)]
        run_number: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution_id: Option<String>,
        #[serde(default)]
        status: String,
        #[serde(default)]
        timestamp: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// TF sample announcement from the fast-processing simulation workflow.
    DataReady {
        #[serde(default)]
        namespace: String,
        #[serde(default)]
        execution_id: String,
        #[serde(default)]
        run_id: u64,
        tf_filename: String,
        #[serde(default)]
        slices: Vec<Value>,
        #[serde(default)]
        timestamp: String,
        #[serde(default)]
        simulation_tick: f64,
    },

    /// Transformer worker result from the results queue.
    SliceResult {
        #[serde(default)]
        namespace: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        run_id: Option<u64>,
        #[serde(default)]
        content: SliceResultContent,
    },

    // -- workflow control --
    RunWorkflow {
        #[serde(default)]
        namespace: String,
        workflow_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config: Option<String>,
        #[serde(default = "default_true")]
        realtime: bool,
        #[serde(default)]
        duration: f64,
        #[serde(default)]
        params: serde_json::Map<String, Value>,
        #[serde(default)]
        timestamp: String,
    },

    StopWorkflow {
        #[serde(default)]
        namespace: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execution_id: Option<String>,
        #[serde(default)]
        timestamp: String,
    },

    StatusRequest {
        #[serde(default)]
        namespace: String,
        #[serde(default)]
        timestamp: String,
    },

    /// Catch-all for unknown message types.
    #[serde(other, skip_serializing)]
    Unknown,
}

impl Message {
    /// The wire tag for this message.
    pub fn msg_type(&self) -> &'static str {
        match self {
            Message::RunImminent { .. } => "run_imminent",
            Message::StartRun { .. } => "start_run",
            Message::PauseRun { .. } => "pause_run",
            Message::ResumeRun { .. } => "resume_run",
            Message::EndRun { .. } => "end_run",
            Message::StfGen { .. } => "stf_gen",
            Message::StfReady { .. } => "stf_ready",
            Message::TfFileRegistered { .. } => "tf_file_registered",
            Message::DataReady { .. } => "data_ready",
            Message::SliceResult { .. } => "slice_result",
            Message::RunWorkflow { .. } => "run_workflow",
            Message::StopWorkflow { .. } => "stop_workflow",
            Message::StatusRequest { .. } => "status_request",
            Message::Unknown => "unknown",
        }
    }

    /// The namespace tag, when the message carries a non-empty one.
    pub fn namespace(&self) -> Option<&str> {
        let ns = match self {
            Message::RunImminent { namespace, .. }
            | Message::StartRun { namespace, .. }
            | Message::PauseRun { namespace, .. }
            | Message::ResumeRun { namespace, .. }
            | Message::EndRun { namespace, .. }
            | Message::StfGen { namespace, .. }
            | Message::StfReady { namespace, .. }
            | Message::TfFileRegistered { namespace, .. }
            | Message::DataReady { namespace, .. }
            | Message::SliceResult { namespace, .. }
            | Message::RunWorkflow { namespace, .. }
            | Message::StopWorkflow { namespace, .. }
            | Message::StatusRequest { namespace, .. } => namespace,
            Message::Unknown => return None,
        };
        if ns.is_empty() {
            None
        } else {
            Some(ns)
        }
    }

    /// The run this message belongs to, when known.
    pub fn run_id(&self) -> Option<u64> {
        match self {
            Message::RunImminent { run_id, .. }
            | Message::StartRun { run_id, .. }
            | Message::PauseRun { run_id, .. }
            | Message::ResumeRun { run_id, .. }
            | Message::EndRun { run_id, .. }
            | Message::StfGen { run_id, .. }
            | Message::StfReady { run_id, .. }
            | Message::DataReady { run_id, .. } => Some(*run_id).filter(|id| *id != 0),
            Message::TfFileRegistered { run_number, .. } => {
                Some(*run_number).filter(|id| *id != 0)
            }
            Message::SliceResult { run_id, .. } => *run_id,
            _ => None,
        }
    }

    /// The workflow execution this message belongs to, when known.
    pub fn execution_id(&self) -> Option<&str> {
        let id = match self {
            Message::RunImminent { execution_id, .. }
            | Message::StartRun { execution_id, .. }
            | Message::PauseRun { execution_id, .. }
            | Message::ResumeRun { execution_id, .. }
            | Message::EndRun { execution_id, .. }
            | Message::StfGen { execution_id, .. }
            | Message::DataReady { execution_id, .. } => execution_id.as_str(),
            Message::StfReady { execution_id, .. }
            | Message::TfFileRegistered { execution_id, .. } => execution_id.as_deref()?,
            _ => return None,
        };
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    // -- DAQ lifecycle constructors --

    pub fn run_imminent(ns: &Namespace, execution_id: &str, run_id: u64, tick: f64) -> Self {
        Message::RunImminent {
            namespace: ns.as_str().to_string(),
            execution_id: execution_id.to_string(),
            run_id,
            timestamp: now_iso(),
            simulation_tick: tick,
            state: "beam".to_string(),
            substate: "not_ready".to_string(),
            target_worker_count: None,
            slices_per_sample: None,
            stf_rate: None,
        }
    }

    pub fn start_run(ns: &Namespace, execution_id: &str, run_id: u64, tick: f64) -> Self {
        Message::StartRun {
            namespace: ns.as_str().to_string(),
            execution_id: execution_id.to_string(),
            run_id,
            timestamp: now_iso(),
            simulation_tick: tick,
            state: "run".to_string(),
            substate: "physics".to_string(),
        }
    }

    pub fn pause_run(
        ns: &Namespace,
        execution_id: &str,
        run_id: u64,
        tick: f64,
        reason: &str,
    ) -> Self {
        Message::PauseRun {
            namespace: ns.as_str().to_string(),
            execution_id: execution_id.to_string(),
            run_id,
            timestamp: now_iso(),
            simulation_tick: tick,
            state: "run".to_string(),
            substate: "standby".to_string(),
            reason: Some(reason.to_string()),
        }
    }

    pub fn resume_run(ns: &Namespace, execution_id: &str, run_id: u64, tick: f64) -> Self {
        Message::ResumeRun {
            namespace: ns.as_str().to_string(),
            execution_id: execution_id.to_string(),
            run_id,
            timestamp: now_iso(),
            simulation_tick: tick,
            state: "run".to_string(),
            substate: "physics".to_string(),
        }
    }

    pub fn end_run_daq(
        ns: &Namespace,
        execution_id: &str,
        run_id: u64,
        tick: f64,
        total_stf_files: u64,
    ) -> Self {
        Message::EndRun {
            namespace: ns.as_str().to_string(),
            execution_id: execution_id.to_string(),
            run_id,
            timestamp: now_iso(),
            simulation_tick: tick,
            total_stf_files: Some(total_stf_files),
            total_tf_files_received: None,
            total_slices_created: None,
        }
    }

    pub fn stf_gen(
        ns: &Namespace,
        execution_id: &str,
        run_id: u64,
        tick: f64,
        filename: String,
        sequence: u64,
    ) -> Self {
        Message::StfGen {
            namespace: ns.as_str().to_string(),
            execution_id: execution_id.to_string(),
            run_id,
            filename,
            sequence,
            timestamp: now_iso(),
            simulation_tick: tick,
            state: "run".to_string(),
            substate: "physics".to_string(),
        }
    }
}

/// Envelope for worker-topic broadcasts and transformer traffic: the payload
/// travels inside `content`, with routing fields at the top level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerMessage {
    pub msg_type: String,
    pub run_id: u64,
    pub created_at: String,
    pub content: Value,
}

impl WorkerMessage {
    pub fn new(msg_type: &str, run_id: u64, content: Value) -> Self {
        Self {
            msg_type: msg_type.to_string(),
            run_id,
            created_at: now_iso(),
            content,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
