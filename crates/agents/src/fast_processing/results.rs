// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slice-result ingest from transformer workers.

use super::FastProcessingAgent;
use serde_json::json;
use swf_core::{now_iso, SliceResultContent};
use swf_monitor::MonitorApi;
use tracing::{debug, info, warn};

impl<M: MonitorApi + 'static> FastProcessingAgent<M> {
    /// Patch the slice record a worker reported on. Results without an
    /// extractable slice id are dropped (the slice stays in its prior
    /// state); a missing row is logged and skipped.
    pub(super) async fn handle_slice_result(
        &mut self,
        message_run_id: Option<u64>,
        content: SliceResultContent,
    ) {
        self.stats.results_received += 1;

        self.log_system_event(
            "slice_result",
            json!({
                "hostname": content.hostname,
                "state": content.state,
                "slice_id": content.slice_id(),
            }),
        )
        .await;

        let done = content.is_done();
        if done {
            self.stats.results_done += 1;
        } else {
            self.stats.results_failed += 1;
        }

        let Some(slice_id) = content.slice_id() else {
            debug!("slice_result without slice_id, dropping");
            return;
        };
        let Some(run_id) = message_run_id.or(self.current_run_id) else {
            debug!(slice_id, "slice_result without run context, dropping");
            return;
        };

        let row = match self.monitor.find_tf_slice(run_id, slice_id).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                warn!(run_id, slice_id, "no slice record for result");
                return;
            }
            Err(e) => {
                warn!(run_id, slice_id, error = %e, "slice lookup failed");
                return;
            }
        };

        let status = if done { "completed" } else { "failed" };
        let processed_at = content.processed_at.clone().unwrap_or_else(now_iso);
        let patch = json!({
            "status": status,
            "processed_at": processed_at,
            "metadata": {
                "worker_hostname": content.hostname,
                "panda_task_id": content.panda_task_id,
                "panda_id": content.panda_id,
                "harvester_id": content.harvester_id,
                "processing_start_at": content.processing_start_at,
                "result": content.result,
            },
        });
        match self.monitor.patch_tf_slice(row.id, &patch).await {
            Ok(()) => info!(run_id, slice_id, status, "slice result recorded"),
            Err(e) => warn!(run_id, slice_id, error = %e, "slice patch failed"),
        }
    }
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
