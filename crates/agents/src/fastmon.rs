// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fast-monitoring agent: samples Time Frames out of Super Time Frames.
//!
//! Consumes `stf_ready` metadata, applies the selection fraction, records
//! simulated TF subsamples in the Monitor, and re-broadcasts
//! `tf_file_registered` for downstream consumers.

use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::sync::Arc;
use swf_agent::{AgentCore, AgentError, MessageHandler};
use swf_broker::{broadcast_headers, Publisher};
use swf_config::FastMonParams;
use swf_core::{now_iso, FastMonFile, Message, TfFileStatus};
use swf_monitor::MonitorApi;
use tracing::{debug, info, warn};

/// TF notifications go back onto the broadcast topic.
pub const BROADCAST_TOPIC: &str = "/topic/epictopic";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FastMonStats {
    pub stf_messages: u64,
    pub stf_sampled: u64,
    pub tf_files_created: u64,
}

pub struct FastMonAgent<M: MonitorApi + 'static> {
    core: Arc<AgentCore<M>>,
    publisher: Arc<dyn Publisher>,
    monitor: Arc<dyn MonitorApi>,
    params: FastMonParams,
    rng: SmallRng,
    current_execution_id: Option<String>,
    stats: FastMonStats,
}

impl<M: MonitorApi + 'static> FastMonAgent<M> {
    /// Validates the sampling configuration up front; an out-of-range
    /// selection fraction is a startup failure.
    pub fn new(
        core: Arc<AgentCore<M>>,
        publisher: Arc<dyn Publisher>,
        monitor: Arc<dyn MonitorApi>,
        params: FastMonParams,
    ) -> Result<Self, swf_config::ConfigError> {
        params.validate()?;
        Ok(Self {
            core,
            publisher,
            monitor,
            params,
            rng: SmallRng::from_os_rng(),
            current_execution_id: None,
            stats: FastMonStats::default(),
        })
    }

    /// Deterministic sampling for tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn stats(&self) -> FastMonStats {
        self.stats
    }

    async fn handle_stf_ready(
        &mut self,
        filename: &str,
        size_bytes: u64,
        run_id: u64,
        state: &str,
        substate: &str,
    ) {
        self.stats.stf_messages += 1;

        if self.rng.random::<f64>() >= self.params.selection_fraction {
            debug!(
                filename,
                selection_fraction = self.params.selection_fraction,
                "STF not selected"
            );
            return;
        }
        self.stats.stf_sampled += 1;
        info!(filename, run_id, "STF selected for fast monitoring");

        let mut created = 0u64;
        for i in 0..self.params.tf_files_per_stf {
            let sequence = self.params.tf_sequence_start + i;
            let tf_filename = swf_core::fastmon_tf_filename(filename, sequence);
            // TF sizes jitter around the configured fraction of the STF.
            let jitter: f64 = self.rng.random_range(0.9..1.1);
            let tf_size = (size_bytes as f64 * self.params.tf_size_fraction * jitter) as u64;

            let record = FastMonFile {
                stf_file: Some(filename.to_string()),
                tf_filename: tf_filename.clone(),
                file_size_bytes: tf_size,
                status: TfFileStatus::Registered,
                metadata: json!({
                    "simulation": true,
                    "created_from": filename,
                    "tf_size_fraction": self.params.tf_size_fraction,
                    "agent_name": self.core.instance_name(),
                    "state": state,
                    "substate": substate,
                }),
            };

            match self.monitor.create_fastmon_file(&record).await {
                Ok(row) => {
                    created += 1;
                    self.stats.tf_files_created += 1;
                    self.notify_tf_registered(row.file_id(), &tf_filename, tf_size, filename, run_id)
                        .await;
                }
                Err(e) => {
                    warn!(tf_filename = %tf_filename, error = %e, "failed to record TF file");
                }
            }
        }

        info!(
            filename,
            tf_files_created = created,
            "registered TF subsamples"
        );
    }

    /// Broadcast `tf_file_registered` so fast-processing can slice.
    async fn notify_tf_registered(
        &self,
        tf_file_id: Option<u64>,
        tf_filename: &str,
        file_size_bytes: u64,
        stf_filename: &str,
        run_number: u64,
    ) {
        let message = Message::TfFileRegistered {
            namespace: self.core.namespace().as_str().to_string(),
            processed_by: Some(self.core.instance_name().to_string()),
            tf_file_id,
            tf_filename: tf_filename.to_string(),
            file_size_bytes,
            stf_filename: stf_filename.to_string(),
            run_number,
            execution_id: self.current_execution_id.clone(),
            status: "registered".to_string(),
            timestamp: now_iso(),
            message: Some(format!(
                "TF file {tf_filename} registered for fast monitoring"
            )),
        };
        let headers = broadcast_headers(
            "tf_file_registered",
            self.core.namespace().as_str(),
            run_number,
        );
        let body = serde_json::to_value(&message).unwrap_or_default();
        if let Err(e) = self.publisher.publish(BROADCAST_TOPIC, body, &headers).await {
            warn!(tf_filename, error = %e, "failed to send TF notification");
        }
    }
}

#[async_trait]
impl<M: MonitorApi + 'static> MessageHandler for FastMonAgent<M> {
    async fn handle(&mut self, message: Message) -> Result<(), AgentError> {
        if let Some(execution_id) = message.execution_id() {
            self.current_execution_id = Some(execution_id.to_string());
        }

        match message {
            Message::StfReady {
                filename,
                size_bytes,
                run_id,
                state,
                substate,
                ..
            } => {
                // Heartbeat on message activity so the Monitor sees the
                // agent working.
                self.core.send_heartbeat().await;
                self.handle_stf_ready(&filename, size_bytes, run_id, &state, &substate)
                    .await;
            }
            other => debug!(msg_type = other.msg_type(), "ignoring message type"),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fastmon_tests.rs"]
mod tests;
