// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use swf_monitor::FakeMonitor;

fn core() -> (AgentCore<FakeMonitor>, FakeMonitor) {
    let monitor = FakeMonitor::new();
    let core = AgentCore::new(
        "Fast_Processing",
        "example",
        Namespace::new("alice"),
        Arc::new(monitor.clone()),
    );
    (core, monitor)
}

#[tokio::test]
async fn starts_ready_with_deterministic_name() {
    let (core, _) = core();
    assert_eq!(core.instance_name(), "fast_processing-agent-example");
    assert_eq!(core.state(), OperationalState::Ready);
}

#[tokio::test]
async fn every_transition_heartbeats_immediately() {
    let (core, monitor) = core();
    core.set_processing().await;
    core.set_ready().await;
    core.set_exited().await;

    let states: Vec<OperationalState> = monitor
        .heartbeats()
        .iter()
        .map(|hb| hb.operational_state)
        .collect();
    assert_eq!(
        states,
        vec![
            OperationalState::Processing,
            OperationalState::Ready,
            OperationalState::Exited,
        ]
    );
}

#[tokio::test]
async fn same_state_transition_is_a_no_op() {
    let (core, monitor) = core();
    core.set_ready().await;
    assert!(monitor.heartbeats().is_empty());
}

#[tokio::test]
async fn payload_reflects_mq_status() {
    let (core, _) = core();
    let payload = core.heartbeat_payload();
    assert_eq!(payload.status, "WARNING");
    assert!(!payload.mq_connected);
    assert!(payload.description.ends_with("MQ: disconnected"));

    core.set_mq_connected(true);
    let payload = core.heartbeat_payload();
    assert_eq!(payload.status, "OK");
    assert!(payload.mq_connected);
    assert_eq!(payload.namespace.as_deref(), Some("alice"));
    assert_eq!(payload.pid, std::process::id());
}

#[tokio::test]
async fn empty_namespace_is_omitted_from_payload() {
    let monitor = FakeMonitor::new();
    let core = AgentCore::new("daq", "sim", Namespace::new(""), Arc::new(monitor));
    assert_eq!(core.heartbeat_payload().namespace, None);
}
