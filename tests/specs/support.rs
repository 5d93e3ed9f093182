// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the scenario suite.

use std::sync::Arc;
use std::time::Duration;
use swf_agent::AgentCore;
use swf_broker::FakePublisher;
use swf_core::Namespace;
use swf_monitor::FakeMonitor;
use swf_runner::WorkflowRunnerAgent;

pub const BROADCAST_TOPIC: &str = "/topic/epictopic";

pub struct RunnerFixture {
    pub agent: WorkflowRunnerAgent<FakeMonitor>,
    pub core: Arc<AgentCore<FakeMonitor>>,
    pub publisher: FakePublisher,
    pub monitor: FakeMonitor,
    _dir: tempfile::TempDir,
}

/// A workflow runner wired to fakes, with a zero-dwell DAQ config on disk.
/// `daq_section` supplies the period and STF generation parameters.
pub fn runner(namespace: &str, daq_section: &str) -> RunnerFixture {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join("stf_datataking_default.toml"),
        format!(
            r#"
[workflow]
name = "stf_datataking"
version = "0.1"

[daq_state_machine]
no_beam_not_ready_delay = 0
broadcast_delay = 0
beam_not_ready_delay = 0
beam_ready_delay = 0
beam_not_ready_end_delay = 0
{daq_section}
"#
        ),
    )
    .expect("write workflow config");

    let overrides: toml::Table = format!("[testbed]\nnamespace = \"{namespace}\"\n")
        .parse()
        .expect("overrides");
    let publisher = FakePublisher::new();
    let monitor = FakeMonitor::new();
    let core = Arc::new(AgentCore::new(
        "stf_datataking",
        "runner",
        Namespace::new(namespace),
        Arc::new(monitor.clone()),
    ));
    let agent = WorkflowRunnerAgent::new(
        Arc::clone(&core),
        Arc::new(publisher.clone()),
        Arc::new(monitor.clone()),
        dir.path(),
        overrides,
        "tester".to_string(),
    );
    RunnerFixture { agent, core, publisher, monitor, _dir: dir }
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
