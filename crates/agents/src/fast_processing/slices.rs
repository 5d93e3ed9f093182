// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TF slice creation and dispatch.

use super::{FastProcessingAgent, TRANSFORMER_QUEUE};
use serde_json::json;
use swf_broker::slice_headers;
use swf_core::{now_iso, plan_slices, SliceContent, SliceMessage, SliceStatus, TfSlice};
use swf_monitor::MonitorApi;
use tracing::{debug, info, warn};

impl<M: MonitorApi + 'static> FastProcessingAgent<M> {
    /// Slice a registered TF file's parent STF into contiguous ranges,
    /// create the slice records, and dispatch one durable message per slice.
    pub(super) async fn handle_tf_file_registered(
        &mut self,
        tf_filename: &str,
        stf_filename: &str,
    ) {
        let Some(run_id) = self.current_run_id else {
            debug!(tf_filename, "tf_file_registered without run context, dropping");
            return;
        };
        self.stats.tf_files_received += 1;
        info!(
            tf_filename,
            stf_filename,
            run_id,
            slices_per_sample = self.params.slices_per_sample,
            "TF file registered, creating slices"
        );

        let execution_id = self.current_execution_id.clone().unwrap_or_default();
        let plan = plan_slices(self.params.slices_per_sample, self.params.tfs_per_stf);
        let mut created = 0u64;

        for bounds in plan {
            let content = SliceContent::new(run_id, &execution_id, stf_filename, bounds);
            let record = TfSlice {
                slice_id: bounds.slice_id,
                tf_first: bounds.tf_first,
                tf_last: bounds.tf_last,
                tf_count: bounds.tf_count,
                tf_filename: content.tf_filename.clone(),
                stf_filename: stf_filename.to_string(),
                run_number: run_id,
                status: SliceStatus::Queued,
                retries: 0,
                metadata: json!({
                    "execution_id": execution_id,
                    "created_by": self.core.instance_name(),
                }),
            };

            match self.monitor.create_tf_slice(&record).await {
                Ok(row) => {
                    created += 1;
                    self.stats.slices_created += 1;
                    debug!(id = row.id, tf_filename = %record.tf_filename, "slice created");
                    self.send_slice(run_id, content).await;
                }
                Err(e) => {
                    warn!(
                        tf_filename = %record.tf_filename,
                        error = %e,
                        "failed to create slice record, not dispatching"
                    );
                }
            }
        }

        self.update_run_state_slices(run_id, created).await;
        self.log_system_event(
            "tf_file_registered",
            json!({
                "tf_filename": tf_filename,
                "stf_filename": stf_filename,
                "slices_created": created,
            }),
        )
        .await;
    }

    /// Publish one slice to the transformer queue. The queue is durable
    /// with a 12-hour TTL, so a failed publish is logged and dropped.
    async fn send_slice(&mut self, run_id: u64, content: SliceContent) {
        let message = SliceMessage::new(run_id, content);
        let body = match serde_json::to_value(&message) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "failed to encode slice message");
                return;
            }
        };
        match self
            .publisher
            .publish(TRANSFORMER_QUEUE, body, &slice_headers(run_id))
            .await
        {
            Ok(()) => {
                self.stats.slices_sent += 1;
                info!(
                    tf_filename = %message.content.tf_filename,
                    destination = TRANSFORMER_QUEUE,
                    "slice sent"
                );
            }
            Err(e) => warn!(
                tf_filename = %message.content.tf_filename,
                error = %e,
                "failed to send slice"
            ),
        }
    }

    /// Increment run-state slice counters via read-modify-write. Safe
    /// because this agent is the run's only slice-counter writer.
    async fn update_run_state_slices(&self, run_id: u64, new_slices: u64) {
        let current = match self.monitor.get_run_state(run_id).await {
            Ok(state) => state,
            Err(e) => {
                warn!(run_id, error = %e, "cannot read run state for counter update");
                return;
            }
        };
        let patch = json!({
            "stf_samples_received": current.stf_samples_received + 1,
            "slices_created": current.slices_created + new_slices,
            "slices_queued": current.slices_queued + new_slices,
            "state_changed_at": now_iso(),
        });
        if let Err(e) = self.monitor.patch_run_state(run_id, &patch).await {
            warn!(run_id, error = %e, "run-state counter update failed");
        }
    }
}

#[cfg(test)]
#[path = "slices_tests.rs"]
mod tests;
