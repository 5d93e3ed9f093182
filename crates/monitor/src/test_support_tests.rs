// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use swf_core::{RunPhase, SliceStatus};

fn run_state(run_number: u64) -> RunState {
    RunState {
        run_number,
        phase: RunPhase::Initializing,
        state: "imminent".to_string(),
        substate: Some("preparing".to_string()),
        target_worker_count: 0,
        active_worker_count: 0,
        stf_samples_received: 0,
        slices_created: 0,
        slices_queued: 0,
        slices_processing: 0,
        slices_completed: 0,
        slices_failed: 0,
        state_changed_at: swf_core::now_iso(),
        metadata: json!({}),
    }
}

#[tokio::test]
async fn sequences_are_monotonic_per_workflow() {
    let monitor = FakeMonitor::new();
    assert_eq!(monitor.next_execution_sequence("a").await.unwrap(), 1);
    assert_eq!(monitor.next_execution_sequence("a").await.unwrap(), 2);
    assert_eq!(monitor.next_execution_sequence("b").await.unwrap(), 1);
}

#[tokio::test]
async fn definitions_reject_duplicates() {
    let monitor = FakeMonitor::new();
    let definition = NewWorkflowDefinition {
        workflow_name: "stf_datataking".to_string(),
        version: "0.1".to_string(),
        workflow_type: "simulation".to_string(),
        definition: "code A".to_string(),
        parameter_values: json!({}),
        created_by: "user".to_string(),
        created_at: swf_core::now_iso(),
    };
    monitor.create_workflow_definition(&definition).await.unwrap();
    let err = monitor
        .create_workflow_definition(&definition)
        .await
        .err()
        .unwrap();
    assert_eq!(err.status_code(), Some(400));
}

#[tokio::test]
async fn run_state_patches_merge_fields() {
    let monitor = FakeMonitor::new();
    monitor.create_run_state(&run_state(7)).await.unwrap();
    monitor
        .patch_run_state(7, &json!({"phase": "physics", "slices_created": 4}))
        .await
        .unwrap();
    let state = monitor.run_state(7).unwrap();
    assert_eq!(state.phase, RunPhase::Physics);
    assert_eq!(state.slices_created, 4);
    // Untouched fields survive.
    assert_eq!(state.state, "imminent");
}

#[tokio::test]
async fn slice_patch_updates_status() {
    let monitor = FakeMonitor::new();
    let row = monitor
        .create_tf_slice(&TfSlice {
            slice_id: 2,
            tf_first: 500,
            tf_last: 749,
            tf_count: 250,
            tf_filename: "x_slice_002.tf".to_string(),
            stf_filename: "x.stf".to_string(),
            run_number: 100,
            status: SliceStatus::Queued,
            retries: 0,
            metadata: json!({}),
        })
        .await
        .unwrap();

    monitor
        .patch_tf_slice(row.id, &json!({"status": "completed"}))
        .await
        .unwrap();

    let found = monitor.find_tf_slice(100, 2).await.unwrap().unwrap();
    assert_eq!(found.slice.status, SliceStatus::Completed);
    assert_eq!(monitor.slice_patches().len(), 1);
}

#[tokio::test]
async fn ensure_namespace_is_idempotent() {
    let monitor = FakeMonitor::new();
    monitor.ensure_namespace("alice").await.unwrap();
    monitor.ensure_namespace("alice").await.unwrap();
    assert_eq!(monitor.namespaces(), vec!["alice".to_string()]);
}
