// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Count-based DAQ run and cooperative stop, end to end through the
//! workflow runner agent.

use super::support::{runner, wait_until, BROADCAST_TOPIC};
use std::sync::Arc;
use swf_agent::MessageHandler;
use swf_core::{ExecutionStatus, Message, OperationalState};

fn run_workflow(realtime: bool) -> Message {
    serde_json::from_value(serde_json::json!({
        "msg_type": "run_workflow",
        "namespace": "alice",
        "workflow_name": "stf_datataking",
        "realtime": realtime,
    }))
    .expect("run_workflow message")
}

#[tokio::test]
async fn count_based_daq_run() {
    let mut f = runner(
        "alice",
        "physics_period_count = 1\nstf_count = 3\nstf_interval = 1\nstf_generation_time = 0.1\n\
         standby_duration = 0",
    );
    f.agent.handle(run_workflow(false)).await.expect("handle");

    let monitor = f.monitor.clone();
    wait_until(move || {
        monitor
            .executions()
            .first()
            .is_some_and(|e| e.status == ExecutionStatus::Completed)
    })
    .await;

    // The exact broadcast sequence on the topic.
    assert_eq!(
        f.publisher.msg_types(BROADCAST_TOPIC),
        vec!["run_imminent", "start_run", "stf_gen", "stf_gen", "stf_gen", "end_run"]
    );

    // STF filenames carry the run id and a zero-padded monotonic sequence.
    let messages = f.publisher.to_destination(BROADCAST_TOPIC);
    let run_id = messages[0]["run_id"].as_u64().expect("run id");
    let filenames: Vec<String> = messages
        .iter()
        .filter(|m| m["msg_type"] == "stf_gen")
        .map(|m| m["filename"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        filenames,
        vec![
            format!("swf.{run_id}.000001.stf"),
            format!("swf.{run_id}.000002.stf"),
            format!("swf.{run_id}.000003.stf"),
        ]
    );

    // Execution record: allocated id, terminal status, end time.
    let executions = f.monitor.executions();
    assert_eq!(executions[0].execution_id, "stf_datataking-tester-0001");
    assert!(executions[0].end_time.is_some());
}

#[tokio::test]
async fn cooperative_stop_terminates_an_infinite_run() {
    // Infinite periods in real time; every dwell is short so the stop flag
    // is observed within one simulation event.
    let mut f = runner(
        "alice",
        "physics_period_count = 0\nstf_count = 1\nstf_interval = 0.05\n\
         stf_generation_time = 0.05\nstandby_duration = 0.05\nphysics_period_duration = 1",
    );
    f.agent.handle(run_workflow(true)).await.expect("handle");

    let monitor = f.monitor.clone();
    wait_until(move || !monitor.executions().is_empty()).await;

    f.agent
        .handle(
            serde_json::from_value(serde_json::json!({
                "msg_type": "stop_workflow",
                "namespace": "alice",
                "execution_id": "stf_datataking-tester-0001",
            }))
            .expect("stop message"),
        )
        .await
        .expect("handle stop");

    let core = Arc::clone(&f.core);
    wait_until(move || core.state() == OperationalState::Ready).await;

    let executions = f.monitor.executions();
    assert_eq!(executions[0].status, ExecutionStatus::Terminated);

    // No further STFs after the stop was honored.
    let count_at_stop = f
        .publisher
        .msg_types(BROADCAST_TOPIC)
        .iter()
        .filter(|t| *t == "stf_gen")
        .count();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    let count_later = f
        .publisher
        .msg_types(BROADCAST_TOPIC)
        .iter()
        .filter(|t| *t == "stf_gen")
        .count();
    assert_eq!(count_at_stop, count_later);
}
