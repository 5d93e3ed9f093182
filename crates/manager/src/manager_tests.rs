// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::supervisor::SupervisorError;
use async_trait::async_trait;
use parking_lot::Mutex;
use swf_broker::FakePublisher;
use swf_monitor::FakeMonitor;

#[derive(Default)]
struct FakeSupervisor {
    calls: Mutex<Vec<String>>,
    fail_start: Mutex<bool>,
}

impl FakeSupervisor {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SupervisorControl for FakeSupervisor {
    async fn ensure_running(&self) -> Result<(), SupervisorError> {
        self.calls.lock().push("ensure".to_string());
        Ok(())
    }

    async fn start_program(&self, program: &str) -> Result<(), SupervisorError> {
        self.calls.lock().push(format!("start {program}"));
        if *self.fail_start.lock() {
            return Err(SupervisorError::Failed {
                command: format!("start {program}"),
                detail: "boom".to_string(),
            });
        }
        Ok(())
    }

    async fn stop_all(&self) -> Result<(), SupervisorError> {
        self.calls.lock().push("stop all".to_string());
        Ok(())
    }

    async fn status(&self) -> Result<String, SupervisorError> {
        self.calls.lock().push("status".to_string());
        Ok("workflow-runner   RUNNING   pid 12345, uptime 0:00:05\n".to_string())
    }
}

struct Fixture {
    manager: UserAgentManager<FakeMonitor>,
    publisher: FakePublisher,
    monitor: FakeMonitor,
    supervisor: Arc<FakeSupervisor>,
    _dir: tempfile::TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("workflows")).unwrap();
    std::fs::write(
        dir.path().join("workflows/two_agent.toml"),
        r#"
[testbed]
namespace = "alice"

[agents.processing]
enabled = true

[agents.fastmon]
enabled = true

[agents.data]
enabled = false

[agents.telescope]
enabled = true
"#,
    )
    .unwrap();

    let publisher = FakePublisher::new();
    let monitor = FakeMonitor::new();
    let supervisor = Arc::new(FakeSupervisor::default());
    let manager = UserAgentManager::new(
        "alice",
        dir.path(),
        Arc::new(monitor.clone()),
        Arc::new(publisher.clone()),
        Arc::clone(&supervisor) as Arc<dyn SupervisorControl>,
    );
    Fixture { manager, publisher, monitor, supervisor, _dir: dir }
}

fn command(body: &str) -> ControlCommand {
    ControlCommand::parse(body).unwrap()
}

#[test]
fn control_queue_is_user_scoped() {
    assert_eq!(control_queue("alice"), "/queue/agent_control.alice");
}

#[tokio::test]
async fn start_testbed_starts_runner_then_enabled_agents() {
    let mut f = fixture();
    let action = f
        .manager
        .handle_command(command(
            r#"{"command": "start_testbed", "config_name": "two_agent"}"#,
        ))
        .await;
    assert_eq!(action, ManagerAction::Continue);
    assert_eq!(f.manager.namespace(), Some("alice"));

    // workflow-runner first, then enabled agents in deterministic order;
    // disabled and unmapped agents are skipped.
    assert_eq!(
        f.supervisor.calls(),
        vec![
            "ensure",
            "start workflow-runner",
            "start example-fastmon-agent",
            "start example-processing-agent",
        ]
    );
}

#[tokio::test]
async fn missing_config_aborts_startup() {
    let mut f = fixture();
    f.manager
        .handle_command(command(
            r#"{"command": "start_testbed", "config_name": "nope"}"#,
        ))
        .await;
    assert!(f.supervisor.calls().is_empty());
}

#[tokio::test]
async fn stop_testbed_stops_everything() {
    let mut f = fixture();
    let action = f
        .manager
        .handle_command(command(r#"{"command": "stop_testbed"}"#))
        .await;
    assert_eq!(action, ManagerAction::Continue);
    assert_eq!(f.supervisor.calls(), vec!["stop all"]);
}

#[tokio::test]
async fn restart_stops_all_and_requests_exit() {
    let mut f = fixture();
    let action = f
        .manager
        .handle_command(command(r#"{"command": "restart"}"#))
        .await;
    assert_eq!(action, ManagerAction::Exit);
    assert_eq!(f.supervisor.calls(), vec!["stop all"]);
}

#[tokio::test]
async fn ping_replies_alive_to_the_requested_destination() {
    let mut f = fixture();
    f.manager
        .handle_command(command(
            r#"{"command": "ping", "reply_to": "/queue/mcp.replies.1"}"#,
        ))
        .await;

    let replies = f.publisher.to_destination("/queue/mcp.replies.1");
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["status"], "alive");
    assert_eq!(replies[0]["username"], "alice");
    assert!(replies[0]["timestamp"].is_string());
}

#[tokio::test]
async fn status_reply_carries_supervisord_output() {
    let mut f = fixture();
    f.manager
        .handle_command(command(
            r#"{"command": "status", "reply_to": "/queue/mcp.replies.2"}"#,
        ))
        .await;

    let replies = f.publisher.to_destination("/queue/mcp.replies.2");
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["username"], "alice");
    assert_eq!(replies[0]["agents_running"], false);
    assert!(replies[0]["supervisord_status"]
        .as_str()
        .unwrap()
        .contains("workflow-runner"));
}

#[tokio::test]
async fn ping_without_reply_to_is_silent() {
    let mut f = fixture();
    f.manager
        .handle_command(command(r#"{"command": "ping"}"#))
        .await;
    assert!(f.publisher.published().is_empty());
}

#[tokio::test]
async fn heartbeat_identifies_the_manager() {
    let mut f = fixture();
    f.manager
        .handle_command(command(
            r#"{"command": "start_testbed", "config_name": "two_agent"}"#,
        ))
        .await;
    f.manager.send_heartbeat().await;

    let heartbeats = f.monitor.heartbeats();
    assert_eq!(heartbeats.len(), 1);
    let hb = &heartbeats[0];
    assert_eq!(hb.instance_name, "agent-manager-alice");
    assert_eq!(hb.agent_type, "agent_manager");
    assert_eq!(hb.operational_state, swf_core::OperationalState::Ready);
    assert_eq!(hb.namespace.as_deref(), Some("alice"));
    assert_eq!(hb.pid, std::process::id());
}

#[tokio::test]
async fn unknown_commands_are_ignored() {
    let mut f = fixture();
    let action = f
        .manager
        .handle_command(command(r#"{"command": "self_destruct"}"#))
        .await;
    assert_eq!(action, ManagerAction::Continue);
    assert!(f.supervisor.calls().is_empty());
}
