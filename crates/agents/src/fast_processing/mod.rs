// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fast-processing agent: TF slicing and slice-result ingest.
//!
//! Subscribes to the broadcast topic and the transformer results queue. On
//! `tf_file_registered` it creates slice records and dispatches durable
//! slice messages; `slice_result` messages from workers patch those records.
//! Per-run counters on the run-state row are read-modify-write, which is
//! safe under the single-writer-per-run discipline.

mod results;
mod slices;

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use swf_agent::{AgentCore, AgentError, MessageHandler};
use swf_broker::{broadcast_headers, Publisher};
use swf_config::FastProcessingParams;
use swf_core::{now_iso, Message, SystemStateEvent, WorkerMessage};
use swf_monitor::MonitorApi;
use tracing::{debug, error, info, warn};

/// Slice distribution queue for transformer workers.
pub const TRANSFORMER_QUEUE: &str = "/topic/panda.slices";

/// Worker lifecycle broadcasts.
pub const WORKER_BROADCAST_TOPIC: &str = "/topic/panda.workers";

/// Results queue workers reply on.
pub const TRANSFORMER_RESULTS_QUEUE: &str = "/queue/panda.results.fastprocessing";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FastProcessingStats {
    pub tf_files_received: u64,
    pub slices_created: u64,
    pub slices_sent: u64,
    pub results_received: u64,
    pub results_done: u64,
    pub results_failed: u64,
}

pub struct FastProcessingAgent<M: MonitorApi + 'static> {
    core: Arc<AgentCore<M>>,
    publisher: Arc<dyn Publisher>,
    monitor: Arc<dyn MonitorApi>,
    current_run_id: Option<u64>,
    current_execution_id: Option<String>,
    params: FastProcessingParams,
    params_loaded: bool,
    stats: FastProcessingStats,
}

impl<M: MonitorApi + 'static> FastProcessingAgent<M> {
    pub fn new(
        core: Arc<AgentCore<M>>,
        publisher: Arc<dyn Publisher>,
        monitor: Arc<dyn MonitorApi>,
    ) -> Self {
        Self {
            core,
            publisher,
            monitor,
            current_run_id: None,
            current_execution_id: None,
            params: FastProcessingParams::default(),
            params_loaded: false,
            stats: FastProcessingStats::default(),
        }
    }

    pub fn stats(&self) -> FastProcessingStats {
        self.stats
    }

    pub fn params(&self) -> &FastProcessingParams {
        &self.params
    }

    /// Track run context from every message. Agents may start mid-run and
    /// miss `run_imminent`, so a changed execution id triggers a parameter
    /// fetch from the execution record.
    async fn update_run_context(&mut self, message: &Message) {
        if let Some(run_id) = message.run_id() {
            if self.current_run_id != Some(run_id) {
                info!(run_id, "new run context, resetting per-run statistics");
                self.current_run_id = Some(run_id);
                self.stats = FastProcessingStats::default();
            }
        }
        if let Some(execution_id) = message.execution_id() {
            if self.current_execution_id.as_deref() != Some(execution_id) {
                self.current_execution_id = Some(execution_id.to_string());
                if !self.params_loaded {
                    self.fetch_workflow_parameters(execution_id).await;
                }
            }
        }
    }

    /// Load `[fast_processing]` parameters from the execution record.
    async fn fetch_workflow_parameters(&mut self, execution_id: &str) {
        let execution = match self.monitor.get_execution(execution_id).await {
            Ok(execution) => execution,
            Err(e) => {
                warn!(execution_id, error = %e, "failed to fetch workflow parameters");
                return;
            }
        };
        match execution.parameter_values.get("fast_processing") {
            Some(section) => match serde_json::from_value::<FastProcessingParams>(section.clone())
            {
                Ok(params) => {
                    info!(execution_id, ?params, "workflow parameters loaded");
                    self.params = params;
                    self.params_loaded = true;
                }
                Err(e) => {
                    warn!(execution_id, error = %e, "cannot decode workflow parameters, using defaults");
                }
            },
            None => {
                // An execution without the section runs on defaults.
                self.params = FastProcessingParams::default();
                self.params_loaded = true;
            }
        }
    }

    fn run_id_or_zero(&self) -> u64 {
        self.current_run_id.unwrap_or(0)
    }

    /// Append a best-effort audit event.
    async fn log_system_event(&self, event_type: &str, event_data: Value) {
        let event = SystemStateEvent {
            timestamp: now_iso(),
            run_number: self.current_run_id,
            event_type: event_type.to_string(),
            state: None,
            substate: None,
            event_data,
        };
        if let Err(e) = self.monitor.post_system_event(&event).await {
            debug!(event_type, error = %e, "failed to log system event");
        }
    }

    /// Best-effort run-state patch; counters go through
    /// [`slices::update_run_state_slices`].
    async fn patch_run_state(&self, patch: Value) {
        let Some(run_id) = self.current_run_id else {
            debug!("no run context, skipping run-state update");
            return;
        };
        if let Err(e) = self.monitor.patch_run_state(run_id, &patch).await {
            warn!(run_id, error = %e, "run-state update failed");
        }
    }

    /// Relay a lifecycle message to the worker topic, payload nested under
    /// `content` with worker sizing attached.
    async fn broadcast_to_workers(&self, message: &Message, extra: Value) {
        let mut content = serde_json::to_value(message).unwrap_or_default();
        if let (Some(target), Some(fields)) = (content.as_object_mut(), extra.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
        let run_id = self.run_id_or_zero();
        let worker_message = WorkerMessage::new(message.msg_type(), run_id, content);
        let namespace = message
            .namespace()
            .unwrap_or_else(|| self.core.namespace().as_str());
        let headers = broadcast_headers(message.msg_type(), namespace, run_id);
        match self
            .publisher
            .publish(WORKER_BROADCAST_TOPIC, serde_json::to_value(&worker_message).unwrap_or_default(), &headers)
            .await
        {
            Ok(()) => info!(
                msg_type = message.msg_type(),
                topic = WORKER_BROADCAST_TOPIC,
                "broadcast to workers"
            ),
            Err(e) => error!(
                msg_type = message.msg_type(),
                error = %e,
                "failed to broadcast to workers"
            ),
        }
    }

    async fn handle_run_imminent(&mut self, message: &Message) {
        info!(
            execution_id = self.current_execution_id.as_deref().unwrap_or(""),
            run_id = self.run_id_or_zero(),
            "run imminent"
        );
        self.log_system_event(
            "run_imminent",
            json!({
                "execution_id": self.current_execution_id,
                "target_worker_count": self.params.target_worker_count,
                "stf_sampling_rate": self.params.stf_sampling_rate,
                "slices_per_sample": self.params.slices_per_sample,
            }),
        )
        .await;

        let sizing = json!({
            "execution_id": self.current_execution_id,
            "target_worker_count": self.params.target_worker_count,
            "slice_processing_time": self.params.slice_processing_time,
            "worker_rampup_time": self.params.worker_rampup_time,
            "worker_rampdown_time": self.params.worker_rampdown_time,
        });
        self.broadcast_to_workers(message, sizing).await;
    }

    async fn handle_start_run(&mut self) {
        info!(run_id = self.run_id_or_zero(), "run started");
        self.core.set_processing().await;
        self.patch_run_state(json!({
            "phase": "physics",
            "state": "running",
            "substate": "physics",
            "state_changed_at": now_iso(),
        }))
        .await;
        self.log_system_event(
            "start_run",
            json!({"execution_id": self.current_execution_id}),
        )
        .await;
    }

    async fn handle_pause_run(&mut self) {
        info!(run_id = self.run_id_or_zero(), "run paused");
        self.patch_run_state(json!({
            "substate": "standby",
            "state_changed_at": now_iso(),
        }))
        .await;
        self.log_system_event(
            "pause_run",
            json!({"execution_id": self.current_execution_id}),
        )
        .await;
    }

    async fn handle_resume_run(&mut self) {
        info!(run_id = self.run_id_or_zero(), "run resumed");
        self.patch_run_state(json!({
            "substate": "physics",
            "state_changed_at": now_iso(),
        }))
        .await;
        self.log_system_event(
            "resume_run",
            json!({"execution_id": self.current_execution_id}),
        )
        .await;
    }

    async fn handle_end_run(&mut self, message: &Message) {
        info!(
            run_id = self.run_id_or_zero(),
            tf_files = self.stats.tf_files_received,
            slices_created = self.stats.slices_created,
            "run ended"
        );
        self.patch_run_state(json!({
            "phase": "completed",
            "state": "ended",
            "substate": null,
            "state_changed_at": now_iso(),
        }))
        .await;
        self.log_system_event(
            "end_run",
            json!({
                "execution_id": self.current_execution_id,
                "total_tf_files_received": self.stats.tf_files_received,
                "total_slices_created": self.stats.slices_created,
                "total_slices_sent": self.stats.slices_sent,
            }),
        )
        .await;

        self.broadcast_to_workers(message, json!({"execution_id": self.current_execution_id}))
            .await;

        // Clear per-run context; the next run starts fresh.
        self.current_run_id = None;
        self.current_execution_id = None;
        self.params = FastProcessingParams::default();
        self.params_loaded = false;
        self.core.set_ready().await;
    }
}

#[async_trait]
impl<M: MonitorApi + 'static> MessageHandler for FastProcessingAgent<M> {
    async fn handle(&mut self, message: Message) -> Result<(), AgentError> {
        self.update_run_context(&message).await;

        match &message {
            Message::RunImminent { .. } => self.handle_run_imminent(&message).await,
            Message::StartRun { .. } => self.handle_start_run().await,
            Message::TfFileRegistered {
                tf_filename,
                stf_filename,
                ..
            } => {
                let tf_filename = tf_filename.clone();
                let stf_filename = stf_filename.clone();
                self.handle_tf_file_registered(&tf_filename, &stf_filename)
                    .await;
            }
            Message::PauseRun { .. } => self.handle_pause_run().await,
            Message::ResumeRun { .. } => self.handle_resume_run().await,
            Message::EndRun { .. } => self.handle_end_run(&message).await,
            Message::SliceResult { run_id, content, .. } => {
                let run_id = *run_id;
                let content = content.clone();
                self.handle_slice_result(run_id, content).await;
            }
            other => debug!(msg_type = other.msg_type(), "ignoring message type"),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
