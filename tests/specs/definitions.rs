// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow definition immutability across executions.

use super::support::{runner, wait_until};
use swf_agent::MessageHandler;
use swf_core::ExecutionStatus;

#[tokio::test]
async fn definition_registered_once_and_reused() {
    let mut f = runner(
        "alice",
        "physics_period_count = 1\nstf_count = 1\nstf_generation_time = 0\nstandby_duration = 0",
    );

    for expected_executions in 1..=2u64 {
        f.agent
            .handle(
                serde_json::from_value(serde_json::json!({
                    "msg_type": "run_workflow",
                    "namespace": "alice",
                    "workflow_name": "stf_datataking",
                    "realtime": false,
                }))
                .expect("run_workflow"),
            )
            .await
            .expect("handle");

        let monitor = f.monitor.clone();
        wait_until(move || {
            monitor
                .executions()
                .iter()
                .filter(|e| e.status == ExecutionStatus::Completed)
                .count() as u64
                == expected_executions
        })
        .await;
    }

    // One immutable definition row; both executions reference it.
    let definitions = f.monitor.definitions();
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].definition.workflow_name, "stf_datataking");
    assert_eq!(definitions[0].definition.version, "0.1");

    let executions = f.monitor.executions();
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[0].execution_id, "stf_datataking-tester-0001");
    assert_eq!(executions[1].execution_id, "stf_datataking-tester-0002");
}
