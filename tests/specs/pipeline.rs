// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fast-monitoring → fast-processing pipeline: TF registration, slicing,
//! and slice-result ingest.

use std::sync::Arc;
use swf_agent::{decode_filtered, AgentCore, MessageHandler};
use swf_agents::fast_processing::{FastProcessingAgent, TRANSFORMER_QUEUE};
use swf_agents::fastmon::FastMonAgent;
use swf_broker::FakePublisher;
use swf_config::FastMonParams;
use swf_core::{Message, Namespace, SliceStatus};
use swf_monitor::{FakeMonitor, MonitorApi};

fn fast_processing(
    monitor: &FakeMonitor,
    publisher: &FakePublisher,
) -> FastProcessingAgent<FakeMonitor> {
    let core = Arc::new(AgentCore::new(
        "Fast_Processing",
        "example",
        Namespace::new("alice"),
        Arc::new(monitor.clone()),
    ));
    FastProcessingAgent::new(core, Arc::new(publisher.clone()), Arc::new(monitor.clone()))
}

fn seed_run(monitor: &FakeMonitor, run_number: u64, execution_id: &str, slices_per_sample: u32) {
    monitor.insert_execution(
        execution_id,
        serde_json::json!({"fast_processing": {"slices_per_sample": slices_per_sample}}),
    );
    monitor.insert_run_state(swf_core::RunState {
        run_number,
        phase: swf_core::RunPhase::Initializing,
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
        metadata: serde_json::json!({}),
    });
}

#[tokio::test]
async fn fastmon_output_feeds_fast_processing_slicing() {
    let monitor = FakeMonitor::new();
    let publisher = FakePublisher::new();
    seed_run(&monitor, 100, "stf_datataking-user-0001", 4);

    // Fast monitoring registers one TF from the STF and re-broadcasts.
    let fastmon_core = Arc::new(AgentCore::new(
        "fastmon",
        "example",
        Namespace::new("alice"),
        Arc::new(monitor.clone()),
    ));
    let mut fastmon = FastMonAgent::new(
        fastmon_core,
        Arc::new(publisher.clone()),
        Arc::new(monitor.clone()),
        FastMonParams {
            selection_fraction: 1.0,
            tf_files_per_stf: 1,
            ..FastMonParams::default()
        },
    )
    .expect("fastmon agent")
    .with_seed(42);

    fastmon
        .handle(
            serde_json::from_value(serde_json::json!({
                "msg_type": "stf_ready",
                "namespace": "alice",
                "filename": "swf.100.000001.stf",
                "size_bytes": 1_000_000u64,
                "run_id": 100,
                "execution_id": "stf_datataking-user-0001",
                "state": "run",
                "substate": "physics",
            }))
            .expect("stf_ready"),
        )
        .await
        .expect("handle stf_ready");

    // The broadcast is consumed by fast-processing, which slices the
    // parent STF.
    let notifications = publisher.to_destination("/topic/epictopic");
    assert_eq!(notifications.len(), 1);
    let tf_registered: Message =
        serde_json::from_value(notifications[0].clone()).expect("tf_file_registered");

    let mut processing = fast_processing(&monitor, &publisher);
    processing.handle(tf_registered).await.expect("handle");

    let slices = monitor.slices();
    assert_eq!(slices.len(), 4);
    assert_eq!(
        slices.iter().map(|s| s.slice.tf_first).collect::<Vec<_>>(),
        vec![0, 250, 500, 750]
    );
    assert_eq!(
        slices.iter().map(|s| s.slice.tf_last).collect::<Vec<_>>(),
        vec![249, 499, 749, 999]
    );
    assert_eq!(publisher.to_destination(TRANSFORMER_QUEUE).len(), 4);

    // RunState counters after one sampled STF.
    let state = monitor.run_state(100).expect("run state");
    assert_eq!(state.stf_samples_received, 1);
    assert_eq!(state.slices_created, 4);
    assert_eq!(state.slices_queued, 4);
}

#[tokio::test]
async fn slice_result_completes_the_record() {
    let monitor = FakeMonitor::new();
    let publisher = FakePublisher::new();
    seed_run(&monitor, 100, "stf_datataking-user-0001", 4);
    let mut processing = fast_processing(&monitor, &publisher);

    // Create the slices, then ingest a worker result for slice 2.
    processing
        .handle(
            serde_json::from_value(serde_json::json!({
                "msg_type": "tf_file_registered",
                "namespace": "alice",
                "tf_filename": "swf.100.000001_tf_001.tf",
                "stf_filename": "swf.100.000001.stf",
                "run_number": 100,
                "execution_id": "stf_datataking-user-0001",
                "status": "registered",
            }))
            .expect("tf_file_registered"),
        )
        .await
        .expect("handle");

    processing
        .handle(
            serde_json::from_value(serde_json::json!({
                "msg_type": "slice_result",
                "run_id": 100,
                "content": {
                    "hostname": "worker-07",
                    "state": "done",
                    "result": {"result": {
                        "slice_id": 2,
                        "tf_filename": "swf.100.000001_slice_002.tf",
                        "processed": true,
                    }},
                },
            }))
            .expect("slice_result"),
        )
        .await
        .expect("handle result");

    let row = monitor
        .find_tf_slice(100, 2)
        .await
        .expect("lookup")
        .expect("row");
    assert_eq!(row.slice.status, SliceStatus::Completed);

    let patches = monitor.slice_patches();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].1["metadata"]["worker_hostname"], "worker-07");
    assert_eq!(processing.stats().results_done, 1);

    // The other slices are untouched.
    for slice_id in [0, 1, 3] {
        let row = monitor
            .find_tf_slice(100, slice_id)
            .await
            .expect("lookup")
            .expect("row");
        assert_eq!(row.slice.status, SliceStatus::Queued);
    }
}

#[tokio::test]
async fn foreign_namespace_messages_never_reach_the_handler() {
    let namespace = Namespace::new("alice");
    let bob_message = serde_json::json!({
        "msg_type": "tf_file_registered",
        "namespace": "bob",
        "tf_filename": "swf.200.000001_tf_001.tf",
        "stf_filename": "swf.200.000001.stf",
        "run_number": 200,
        "status": "registered",
    })
    .to_string();
    assert!(decode_filtered(&bob_message, &namespace).is_none());
}
