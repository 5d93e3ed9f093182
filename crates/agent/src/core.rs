// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared agent state: identity, lifecycle, heartbeats.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use swf_core::{agent_instance_name, HeartbeatPayload, Namespace, OperationalState};
use swf_monitor::MonitorApi;
use tracing::{debug, info, warn};

/// Best-effort hostname for heartbeat payloads.
pub fn hostname() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .map(|s| s.trim().to_string())
        .ok()
        .filter(|s| !s.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Identity, lifecycle state, and heartbeat plumbing for one agent process.
pub struct AgentCore<M: MonitorApi> {
    agent_type: String,
    instance_name: String,
    namespace: Namespace,
    monitor: Arc<M>,
    state: Mutex<OperationalState>,
    mq_connected: AtomicBool,
    hostname: String,
}

impl<M: MonitorApi> AgentCore<M> {
    pub fn new(
        agent_type: &str,
        instance_suffix: &str,
        namespace: Namespace,
        monitor: Arc<M>,
    ) -> Self {
        Self {
            agent_type: agent_type.to_string(),
            instance_name: agent_instance_name(agent_type, instance_suffix),
            namespace,
            monitor,
            state: Mutex::new(OperationalState::Ready),
            mq_connected: AtomicBool::new(false),
            hostname: hostname(),
        }
    }

    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn monitor(&self) -> &Arc<M> {
        &self.monitor
    }

    pub fn state(&self) -> OperationalState {
        *self.state.lock()
    }

    pub fn set_mq_connected(&self, connected: bool) {
        self.mq_connected.store(connected, Ordering::SeqCst);
    }

    pub fn mq_connected(&self) -> bool {
        self.mq_connected.load(Ordering::SeqCst)
    }

    /// Transition lifecycle state; every transition heartbeats immediately.
    pub async fn set_state(&self, state: OperationalState) {
        {
            let mut current = self.state.lock();
            if *current == state {
                return;
            }
            info!(agent = %self.instance_name, from = %*current, to = %state, "state transition");
            *current = state;
        }
        self.send_heartbeat().await;
    }

    pub async fn set_ready(&self) {
        self.set_state(OperationalState::Ready).await;
    }

    pub async fn set_processing(&self) {
        self.set_state(OperationalState::Processing).await;
    }

    pub async fn set_warning(&self) {
        self.set_state(OperationalState::Warning).await;
    }

    /// Reported before broker disconnect on clean shutdown.
    pub async fn set_exited(&self) {
        self.set_state(OperationalState::Exited).await;
    }

    pub fn heartbeat_payload(&self) -> HeartbeatPayload {
        let mq_connected = self.mq_connected();
        let mq_status = if mq_connected { "connected" } else { "disconnected" };
        HeartbeatPayload {
            instance_name: self.instance_name.clone(),
            agent_type: self.agent_type.clone(),
            status: if mq_connected { "OK" } else { "WARNING" }.to_string(),
            operational_state: self.state(),
            namespace: (!self.namespace.is_empty()).then(|| self.namespace.as_str().to_string()),
            pid: std::process::id(),
            hostname: self.hostname.clone(),
            description: format!("{} agent. MQ: {mq_status}", self.agent_type),
            mq_connected,
        }
    }

    /// Upsert the agent row in the Monitor. Failures are non-fatal.
    pub async fn send_heartbeat(&self) {
        let payload = self.heartbeat_payload();
        match self.monitor.send_heartbeat(&payload).await {
            Ok(()) => debug!(agent = %self.instance_name, state = %payload.operational_state, "heartbeat sent"),
            Err(e) => warn!(agent = %self.instance_name, error = %e, "heartbeat failed"),
        }
    }
}

#[cfg(test)]
#[path = "core_tests.rs"]
mod tests;
