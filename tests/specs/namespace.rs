// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespace isolation: two DAQ streams on the same topic, one consumer.

use std::sync::Arc;
use swf_agent::{decode_filtered, AgentCore, MessageHandler};
use swf_agents::fast_processing::FastProcessingAgent;
use swf_broker::FakePublisher;
use swf_core::{Namespace, RunPhase, RunState};
use swf_monitor::FakeMonitor;

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
        metadata: serde_json::json!({}),
    }
}

fn tf_registered(namespace: &str, run_number: u64, execution_id: &str) -> String {
    serde_json::json!({
        "msg_type": "tf_file_registered",
        "namespace": namespace,
        "tf_filename": format!("swf.{run_number}.000001_tf_001.tf"),
        "stf_filename": format!("swf.{run_number}.000001.stf"),
        "run_number": run_number,
        "execution_id": execution_id,
        "status": "registered",
    })
    .to_string()
}

#[tokio::test]
async fn concurrent_namespaces_stay_isolated() {
    // Alice's monitor sees alice's run; bob's run lives elsewhere entirely.
    let monitor = FakeMonitor::new();
    monitor.insert_execution(
        "stf_datataking-alice-0001",
        serde_json::json!({"fast_processing": {"slices_per_sample": 2}}),
    );
    monitor.insert_run_state(run_state(100));
    monitor.insert_run_state(run_state(200));

    let publisher = FakePublisher::new();
    let agent_namespace = Namespace::new("alice");
    let core = Arc::new(AgentCore::new(
        "Fast_Processing",
        "example",
        agent_namespace.clone(),
        Arc::new(monitor.clone()),
    ));
    let mut agent = FastProcessingAgent::new(
        core,
        Arc::new(publisher.clone()),
        Arc::new(monitor.clone()),
    );

    // Interleaved delivery, as a shared topic would produce it.
    let bodies = [
        tf_registered("alice", 100, "stf_datataking-alice-0001"),
        tf_registered("bob", 200, "stf_datataking-bob-0001"),
        tf_registered("alice", 100, "stf_datataking-alice-0001"),
        tf_registered("bob", 200, "stf_datataking-bob-0001"),
    ];
    for body in &bodies {
        // The runtime's filter decides; handlers only ever see matches.
        let Some(message) = decode_filtered(body, &agent_namespace) else {
            continue;
        };
        agent.handle(message).await.expect("handle");
    }

    // Alice's run accounted for exactly her two samples.
    let alice = monitor.run_state(100).expect("alice run state");
    assert_eq!(alice.stf_samples_received, 2);
    assert_eq!(alice.slices_created, 4);

    // Bob's run state is untouched and no slices exist for his run.
    let bob = monitor.run_state(200).expect("bob run state");
    assert_eq!(bob.stf_samples_received, 0);
    assert_eq!(bob.slices_created, 0);
    assert!(monitor
        .slices()
        .iter()
        .all(|row| row.slice.run_number == 100));
}
