// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-user agent manager.

use crate::commands::ControlCommand;
use crate::supervisor::{program_for, SupervisorControl};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use swf_agent::hostname;
use swf_broker::{Connection, Inbound, Publisher};
use swf_config::{enabled_agents, load_testbed_config, testbed_namespace};
use swf_core::{now_iso, HeartbeatPayload, OperationalState};
use swf_monitor::MonitorApi;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Heartbeat cadence; faster than regular agents so MCP discovery is quick.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

const WORKFLOW_RUNNER_PROGRAM: &str = "workflow-runner";

/// The user-scoped control queue.
pub fn control_queue(username: &str) -> String {
    format!("/queue/agent_control.{username}")
}

/// What the main loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerAction {
    Continue,
    /// A replacement process was spawned; disconnect and exit.
    Exit,
}

pub struct UserAgentManager<M: MonitorApi + 'static> {
    username: String,
    instance_name: String,
    testbed_dir: PathBuf,
    monitor: Arc<M>,
    publisher: Arc<dyn Publisher>,
    supervisor: Arc<dyn SupervisorControl>,
    namespace: Option<String>,
    config: Option<toml::Table>,
    agents_running: bool,
    hostname: String,
}

impl<M: MonitorApi + 'static> UserAgentManager<M> {
    pub fn new(
        username: &str,
        testbed_dir: impl Into<PathBuf>,
        monitor: Arc<M>,
        publisher: Arc<dyn Publisher>,
        supervisor: Arc<dyn SupervisorControl>,
    ) -> Self {
        let mut manager = Self {
            username: username.to_string(),
            instance_name: format!("agent-manager-{username}"),
            testbed_dir: testbed_dir.into(),
            monitor,
            publisher,
            supervisor,
            namespace: None,
            config: None,
            agents_running: false,
            hostname: hostname(),
        };
        // Pick up the configured testbed immediately when the environment
        // names one.
        if std::env::var("SWF_TESTBED_CONFIG").is_ok() {
            manager.load_config(None);
        }
        manager
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn config_path(&self, config_name: Option<&str>) -> PathBuf {
        match config_name {
            None => std::env::var("SWF_TESTBED_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| self.testbed_dir.join("workflows/testbed.toml")),
            Some(name) if name.contains('/') => self.testbed_dir.join(name),
            Some(name) => {
                let file = if name.ends_with(".toml") {
                    name.to_string()
                } else {
                    format!("{name}.toml")
                };
                self.testbed_dir.join("workflows").join(file)
            }
        }
    }

    /// Load a testbed config and adopt its namespace.
    fn load_config(&mut self, config_name: Option<&str>) -> bool {
        let path = self.config_path(config_name);
        match load_testbed_config(&path) {
            Ok(config) => {
                self.namespace = testbed_namespace(&config);
                match &self.namespace {
                    Some(namespace) => {
                        info!(config = %path.display(), namespace = %namespace, "config loaded");
                    }
                    None => warn!(config = %path.display(), "no namespace in config"),
                }
                self.config = Some(config);
                true
            }
            Err(e) => {
                error!(config = %path.display(), error = %e, "cannot load config");
                false
            }
        }
    }

    /// Supervisord program names for the enabled agents, in startup order.
    fn enabled_programs(&self) -> Vec<&'static str> {
        let Some(config) = &self.config else {
            return Vec::new();
        };
        enabled_agents(config)
            .iter()
            .filter_map(|agent| {
                let program = program_for(agent);
                if program.is_none() {
                    warn!(agent = %agent, "unknown agent, no program mapping");
                }
                program
            })
            .collect()
    }

    pub async fn handle_command(&mut self, command: ControlCommand) -> ManagerAction {
        info!(command = %command.command, "received command");
        match command.command.as_str() {
            "start_testbed" => {
                self.handle_start_testbed(command.config_name.as_deref())
                    .await;
            }
            "stop_testbed" => {
                self.handle_stop_testbed().await;
            }
            "restart" => {
                self.handle_stop_testbed().await;
                self.spawn_replacement();
                return ManagerAction::Exit;
            }
            "status" => {
                self.handle_status(command.reply_to.as_deref()).await;
            }
            "ping" => {
                self.handle_ping(command.reply_to.as_deref()).await;
            }
            other => info!(command = other, "unknown command"),
        }
        ManagerAction::Continue
    }

    async fn handle_start_testbed(&mut self, config_name: Option<&str>) {
        info!(config = config_name.unwrap_or("default"), "starting testbed");
        if !self.load_config(config_name) {
            return;
        }
        if let Err(e) = self.supervisor.ensure_running().await {
            error!(error = %e, "failed to start supervisord");
            return;
        }
        if let Err(e) = self.supervisor.start_program(WORKFLOW_RUNNER_PROGRAM).await {
            error!(error = %e, "failed to start workflow-runner");
            return;
        }

        let programs = self.enabled_programs();
        if programs.is_empty() {
            warn!("no agents enabled in config");
        }
        for program in programs {
            if let Err(e) = self.supervisor.start_program(program).await {
                error!(program, error = %e, "failed to start agent");
            }
        }
        self.agents_running = true;
        info!("testbed started");
    }

    async fn handle_stop_testbed(&mut self) {
        info!("stopping testbed");
        match self.supervisor.stop_all().await {
            Ok(()) => {
                self.agents_running = false;
                info!("testbed stopped");
            }
            Err(e) => error!(error = %e, "error stopping testbed"),
        }
    }

    /// Spawn a fresh agent-manager in a new session so a restart picks up
    /// current code and environment.
    fn spawn_replacement(&self) {
        info!("spawning replacement agent manager");
        let result = tokio::process::Command::new("testbed")
            .arg("agent-manager")
            .current_dir(&self.testbed_dir)
            .process_group(0)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn();
        match result {
            Ok(_) => info!("replacement spawned, exiting"),
            Err(e) => error!(error = %e, "failed to spawn replacement"),
        }
    }

    async fn handle_status(&self, reply_to: Option<&str>) {
        let supervisord_status = match self.supervisor.status().await {
            Ok(status) => status,
            Err(e) => format!("unavailable: {e}"),
        };
        let status = json!({
            "username": self.username,
            "agents_running": self.agents_running,
            "supervisord_status": supervisord_status,
            "timestamp": now_iso(),
        });
        info!(agents_running = self.agents_running, "status gathered");
        if let Some(reply_to) = reply_to {
            if let Err(e) = self.publisher.publish(reply_to, status, &[]).await {
                warn!(reply_to, error = %e, "failed to send status reply");
            }
        }
    }

    async fn handle_ping(&self, reply_to: Option<&str>) {
        let reply = json!({
            "status": "alive",
            "username": self.username,
            "timestamp": now_iso(),
        });
        if let Some(reply_to) = reply_to {
            if let Err(e) = self.publisher.publish(reply_to, reply, &[]).await {
                warn!(reply_to, error = %e, "failed to send ping reply");
            }
        }
    }

    fn heartbeat_payload(&self) -> HeartbeatPayload {
        let mut description = format!("Agent manager for {}", self.username);
        if let Some(namespace) = &self.namespace {
            description.push_str(&format!(". namespace: {namespace}"));
        }
        description.push_str(". MQ: connected");
        HeartbeatPayload {
            instance_name: self.instance_name.clone(),
            agent_type: "agent_manager".to_string(),
            status: "OK".to_string(),
            operational_state: OperationalState::Ready,
            namespace: self.namespace.clone(),
            pid: std::process::id(),
            hostname: self.hostname.clone(),
            description,
            mq_connected: true,
        }
    }

    /// Heartbeat failure is never fatal.
    pub async fn send_heartbeat(&self) {
        if let Err(e) = self.monitor.send_heartbeat(&self.heartbeat_payload()).await {
            warn!(error = %e, "heartbeat failed");
        }
    }

    /// Main loop: subscribe to the control queue, heartbeat every 30
    /// seconds (immediately on startup for fast MCP discovery), and handle
    /// commands until shutdown or restart.
    pub async fn run(
        &mut self,
        connection: Connection,
        mut inbound: mpsc::Receiver<Inbound>,
        shutdown: CancellationToken,
    ) -> Result<(), swf_broker::TransportError> {
        let queue = control_queue(&self.username);
        connection.subscribe(&queue).await?;
        self.send_heartbeat().await;
        info!(queue = %queue, username = %self.username, "agent manager ready");

        let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.reset();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("shutdown signal, exiting");
                    break;
                }
                _ = ticker.tick() => self.send_heartbeat().await,
                received = inbound.recv() => {
                    match received {
                        Some(Inbound { body, .. }) => {
                            let Some(command) = ControlCommand::parse(&body) else {
                                continue;
                            };
                            if self.handle_command(command).await == ManagerAction::Exit {
                                break;
                            }
                        }
                        None => {
                            warn!("broker channel closed, exiting");
                            break;
                        }
                    }
                }
            }
        }

        connection.disconnect().await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
