// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Example processing agent.
//!
//! A thin illustrative consumer: tracks run context from the broadcast
//! stream and appends an audit event per STF it "processes". Real
//! reconstruction lives outside the testbed.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use swf_agent::{AgentCore, AgentError, MessageHandler};
use swf_core::{now_iso, Message, SystemStateEvent};
use swf_monitor::MonitorApi;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingStats {
    pub total_processed: u64,
}

pub struct ExampleProcessingAgent<M: MonitorApi + 'static> {
    core: Arc<AgentCore<M>>,
    monitor: Arc<dyn MonitorApi>,
    current_run_id: Option<u64>,
    stats: ProcessingStats,
}

impl<M: MonitorApi + 'static> ExampleProcessingAgent<M> {
    pub fn new(core: Arc<AgentCore<M>>, monitor: Arc<dyn MonitorApi>) -> Self {
        Self {
            core,
            monitor,
            current_run_id: None,
            stats: ProcessingStats::default(),
        }
    }

    pub fn stats(&self) -> ProcessingStats {
        self.stats
    }

    async fn handle_stf_ready(&mut self, filename: &str, size_bytes: u64) {
        self.stats.total_processed += 1;
        info!(filename, size_bytes, "simulating STF processing");

        let event = SystemStateEvent {
            timestamp: now_iso(),
            run_number: self.current_run_id,
            event_type: "stf_processed".to_string(),
            state: None,
            substate: None,
            event_data: json!({
                "filename": filename,
                "processed_by": self.core.instance_name(),
                "processing_stage": "reconstruction",
            }),
        };
        if let Err(e) = self.monitor.post_system_event(&event).await {
            debug!(filename, error = %e, "failed to log processing event");
        }
    }
}

#[async_trait]
impl<M: MonitorApi + 'static> MessageHandler for ExampleProcessingAgent<M> {
    async fn handle(&mut self, message: Message) -> Result<(), AgentError> {
        if let Some(run_id) = message.run_id() {
            self.current_run_id = Some(run_id);
        }

        match message {
            Message::StfReady { filename, size_bytes, .. } => {
                self.handle_stf_ready(&filename, size_bytes).await;
            }
            Message::StartRun { run_id, .. } => {
                info!(run_id, "run started");
                self.core.set_processing().await;
            }
            Message::EndRun { run_id, .. } => {
                info!(run_id, processed = self.stats.total_processed, "run ended");
                self.core.set_ready().await;
            }
            other => debug!(msg_type = other.msg_type(), "ignoring message type"),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "processing_tests.rs"]
mod tests;
