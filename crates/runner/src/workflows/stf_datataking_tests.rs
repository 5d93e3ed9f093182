// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::driver::{drive, RunOutcome};
use crate::executor::BROADCAST_TOPIC;
use crate::sim::{SimClock, SimMode};
use std::sync::Arc;
use swf_broker::FakePublisher;
use swf_monitor::FakeMonitor;
use tokio_util::sync::CancellationToken;

fn config(daq_overrides: &str) -> toml::Table {
    let mut table: toml::Table = r#"
[workflow]
name = "stf_datataking"
version = "0.1"

[testbed]
namespace = "alice"

[daq_state_machine]
no_beam_not_ready_delay = 0
broadcast_delay = 0
beam_not_ready_delay = 0
beam_ready_delay = 0
physics_period_count = 1
physics_period_duration = 60
stf_interval = 1.0
stf_generation_time = 0.1
standby_duration = 0
beam_not_ready_end_delay = 0
"#
    .parse()
    .unwrap();
    let overrides: toml::Table = daq_overrides.parse().unwrap();
    if let Some(daq) = table
        .get_mut("daq_state_machine")
        .and_then(toml::Value::as_table_mut)
    {
        for (key, value) in overrides {
            daq.insert(key, value);
        }
    }
    table
}

struct Run {
    publisher: FakePublisher,
    monitor: FakeMonitor,
    outcome: RunOutcome,
}

async fn run_daq(config: &toml::Table) -> Run {
    let publisher = FakePublisher::new();
    let monitor = FakeMonitor::new();
    let mut executor = DaqExecutor::from_config(config).unwrap();
    let mut env = WorkflowEnv {
        publisher: Arc::new(publisher.clone()),
        monitor: Arc::new(monitor.clone()),
        namespace: Namespace::new("alice"),
        execution_id: "stf_datataking-alice-0001".to_string(),
        clock: SimClock::new(SimMode::Fast),
    };
    let outcome = drive(&mut executor, &mut env, &CancellationToken::new(), 0.0)
        .await
        .unwrap();
    Run { publisher, monitor, outcome }
}

#[tokio::test]
async fn count_based_run_broadcasts_the_expected_sequence() {
    let run = run_daq(&config("stf_count = 3")).await;
    assert_eq!(run.outcome, RunOutcome::Completed);
    assert_eq!(
        run.publisher.msg_types(BROADCAST_TOPIC),
        vec!["run_imminent", "start_run", "stf_gen", "stf_gen", "stf_gen", "end_run"]
    );

    let messages = run.publisher.to_destination(BROADCAST_TOPIC);
    let run_id = messages[0]["run_id"].as_u64().unwrap();
    assert_eq!(run_id, 1);

    // STF sequence is strictly monotonic from 1, filenames zero-padded.
    let stf_gens: Vec<&serde_json::Value> = messages
        .iter()
        .filter(|m| m["msg_type"] == "stf_gen")
        .collect();
    for (i, stf) in stf_gens.iter().enumerate() {
        let sequence = (i + 1) as u64;
        assert_eq!(stf["sequence"].as_u64(), Some(sequence));
        assert_eq!(
            stf["filename"].as_str(),
            Some(format!("swf.{run_id}.{sequence:06}.stf").as_str())
        );
        assert_eq!(stf["state"], "run");
        assert_eq!(stf["substate"], "physics");
    }

    let end = messages.last().unwrap();
    assert_eq!(end["total_stf_files"].as_u64(), Some(3));
}

#[tokio::test]
async fn every_broadcast_carries_the_namespace() {
    let run = run_daq(&config("stf_count = 2")).await;
    for message in run.publisher.to_destination(BROADCAST_TOPIC) {
        assert_eq!(message["namespace"], "alice");
        assert_eq!(message["execution_id"], "stf_datataking-alice-0001");
    }
}

#[tokio::test]
async fn run_state_row_exists_before_the_run_is_imminent() {
    let run = run_daq(&config("stf_count = 1")).await;
    let state = run.monitor.run_state(1).unwrap();
    assert_eq!(state.state, "imminent");
    assert_eq!(state.substate.as_deref(), Some("preparing"));
    assert_eq!(state.metadata["execution_id"], "stf_datataking-alice-0001");
}

#[tokio::test]
async fn zero_stf_count_still_opens_and_closes_the_run() {
    let run = run_daq(&config("stf_count = 0")).await;
    assert_eq!(
        run.publisher.msg_types(BROADCAST_TOPIC),
        vec!["run_imminent", "start_run", "end_run"]
    );
    let end = run.publisher.to_destination(BROADCAST_TOPIC).pop().unwrap();
    assert_eq!(end["total_stf_files"].as_u64(), Some(0));
}

#[tokio::test]
async fn duration_based_generation_respects_the_period_window() {
    // Window of 2s with 1s spacing and 0.1s generation: STFs land at ticks
    // inside the window until the next check falls past it.
    let run = run_daq(&config("physics_period_duration = 2.0\nstf_generation_time = 0.1")).await;
    let types = run.publisher.msg_types(BROADCAST_TOPIC);
    assert_eq!(types.first().map(String::as_str), Some("run_imminent"));
    assert_eq!(types.last().map(String::as_str), Some("end_run"));
    let stf_count = types.iter().filter(|t| *t == "stf_gen").count();
    assert_eq!(stf_count, 2);
}

#[tokio::test]
async fn multiple_periods_pause_and_resume() {
    let run = run_daq(&config("stf_count = 1\nphysics_period_count = 2")).await;
    assert_eq!(
        run.publisher.msg_types(BROADCAST_TOPIC),
        vec![
            "run_imminent",
            "start_run",
            "stf_gen",
            "pause_run",
            "resume_run",
            "stf_gen",
            "end_run"
        ]
    );

    let messages = run.publisher.to_destination(BROADCAST_TOPIC);
    let pause = &messages[3];
    assert_eq!(pause["substate"], "standby");
    assert_eq!(pause["reason"], "Brief standby period");
    // The sequence keeps counting across periods.
    assert_eq!(messages[5]["sequence"].as_u64(), Some(2));
    assert_eq!(messages[6]["total_stf_files"].as_u64(), Some(2));
}

#[tokio::test]
async fn identical_configs_produce_identical_sequences() {
    let table = config("stf_count = 5\nphysics_period_count = 2");
    let first = run_daq(&table).await;
    let second = run_daq(&table).await;

    let strip: fn(&serde_json::Value) -> (String, Option<u64>, Option<String>) = |m| {
        (
            m["msg_type"].as_str().unwrap_or_default().to_string(),
            m["sequence"].as_u64(),
            m["filename"].as_str().map(str::to_string),
        )
    };
    let a: Vec<_> = first.publisher.to_destination(BROADCAST_TOPIC).iter().map(strip).collect();
    let b: Vec<_> = second.publisher.to_destination(BROADCAST_TOPIC).iter().map(strip).collect();
    assert_eq!(a, b);
}
