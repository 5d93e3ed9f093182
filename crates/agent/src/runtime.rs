// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent main loop.
//!
//! Wires subscriptions, the inbound channel, the heartbeat ticker, and
//! shutdown into one dispatch loop. Handler code runs here, on the agent's
//! task, never on the transport's I/O task.

use crate::core::AgentCore;
use crate::dispatch::decode_filtered;
use crate::error::AgentError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use swf_broker::{Connection, Inbound};
use swf_core::Message;
use swf_monitor::MonitorApi;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Per-agent message handling. Errors are logged and the loop continues;
/// a bad message must never take the agent down.
#[async_trait]
pub trait MessageHandler: Send {
    async fn handle(&mut self, message: Message) -> Result<(), AgentError>;
}

/// Run an agent until shutdown or until the broker connection is lost for
/// good. Subscribes to every destination, heartbeats every 60 seconds, and
/// reports `EXITED` before disconnecting.
pub async fn run_agent<M, H>(
    core: Arc<AgentCore<M>>,
    connection: Connection,
    mut inbound: mpsc::Receiver<Inbound>,
    destinations: &[&str],
    handler: &mut H,
    shutdown: CancellationToken,
) -> Result<(), AgentError>
where
    M: MonitorApi,
    H: MessageHandler,
{
    for destination in destinations {
        connection.subscribe(destination).await?;
    }
    core.set_mq_connected(true);

    // Initial registration heartbeat.
    core.send_heartbeat().await;
    info!(agent = core.instance_name(), "agent running");

    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.reset();

    let result = loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!(agent = core.instance_name(), "shutdown requested");
                break Ok(());
            }
            _ = ticker.tick() => {
                core.set_mq_connected(connection.is_connected());
                core.send_heartbeat().await;
            }
            received = inbound.recv() => {
                match received {
                    Some(Inbound { destination, body }) => {
                        let Some(message) = decode_filtered(&body, core.namespace()) else {
                            continue;
                        };
                        if let Err(e) = handler.handle(message).await {
                            error!(
                                agent = core.instance_name(),
                                destination = %destination,
                                error = %e,
                                "message handler failed"
                            );
                            core.set_warning().await;
                        }
                    }
                    None => {
                        warn!(agent = core.instance_name(), "broker channel closed");
                        core.set_mq_connected(false);
                        break Err(AgentError::ConnectionLost);
                    }
                }
            }
        }
    };

    // EXITED is reported before the broker disconnect.
    core.set_exited().await;
    connection.disconnect().await;
    core.set_mq_connected(false);
    result
}
