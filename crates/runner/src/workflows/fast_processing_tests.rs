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

fn config() -> toml::Table {
    r#"
[workflow]
name = "fast_processing"
version = "0.2"

[testbed]
namespace = "alice"

[fast_processing]
run_duration = 2.5
stf_rate = 1.0
broadcast_delay = 0
run_imminent_delay = 0
worker_rampdown_time = 0
slices_per_sample = 3
target_worker_count = 5
"#
    .parse()
    .unwrap()
}

async fn run_workflow(config: &toml::Table) -> FakePublisher {
    let publisher = FakePublisher::new();
    let mut executor = FastProcessingExecutor::from_config(config).unwrap();
    let mut env = WorkflowEnv {
        publisher: Arc::new(publisher.clone()),
        monitor: Arc::new(FakeMonitor::new()),
        namespace: Namespace::new("alice"),
        execution_id: "fast_processing-alice-0001".to_string(),
        clock: SimClock::new(SimMode::Fast),
    };
    let outcome = drive(&mut executor, &mut env, &CancellationToken::new(), 0.0)
        .await
        .unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
    publisher
}

#[tokio::test]
async fn announces_worker_sizing_then_samples_then_ends() {
    let publisher = run_workflow(&config()).await;
    let types = publisher.msg_types(BROADCAST_TOPIC);

    assert_eq!(types.first().map(String::as_str), Some("run_imminent"));
    assert_eq!(types.get(1).map(String::as_str), Some("start_run"));
    assert_eq!(types.last().map(String::as_str), Some("end_run"));
    let samples = types.iter().filter(|t| *t == "data_ready").count();
    assert!(samples >= 2, "expected at least two samples, got {samples}");
    // Nothing but samples between start and end.
    assert_eq!(types.len(), samples + 3);

    let messages = publisher.to_destination(BROADCAST_TOPIC);
    let imminent = &messages[0];
    assert_eq!(imminent["target_worker_count"].as_u64(), Some(5));
    assert_eq!(imminent["slices_per_sample"].as_u64(), Some(3));
    assert_eq!(imminent["stf_rate"].as_f64(), Some(1.0));

    let end = messages.last().unwrap();
    assert_eq!(
        end["total_tf_files_received"].as_u64(),
        Some(samples as u64)
    );
    assert_eq!(
        end["total_slices_created"].as_u64(),
        Some(3 * samples as u64)
    );
}

#[tokio::test]
async fn sample_filenames_and_slices_are_sequential() {
    let publisher = run_workflow(&config()).await;
    let samples: Vec<serde_json::Value> = publisher
        .to_destination(BROADCAST_TOPIC)
        .into_iter()
        .filter(|m| m["msg_type"] == "data_ready")
        .collect();

    for (i, sample) in samples.iter().enumerate() {
        let expected = format!("tf.1.{:06}.sample", i + 1);
        assert_eq!(sample["tf_filename"].as_str(), Some(expected.as_str()));
        let slices = sample["slices"].as_array().unwrap();
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0]["slice_id"], 1);
        assert_eq!(slices[0]["tf_filename"].as_str(), Some(expected.as_str()));
    }
}
