// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow-control command sender.
//!
//! A short-lived broker session publishing to the workflow-control queue
//! with the namespace from the testbed config.

use clap::Subcommand;
use std::path::Path;
use swf_broker::{BrokerSettings, Connection};
use swf_config::{load_testbed_config, testbed_namespace};
use swf_core::{now_iso, Message};

const WORKFLOW_CONTROL_QUEUE: &str = "/queue/workflow_control";

#[derive(Subcommand)]
pub enum SendCommand {
    /// Start a workflow
    Run {
        /// Workflow name
        #[arg(default_value = "stf_datataking")]
        workflow: String,

        /// Workflow config name
        #[arg(long)]
        config: Option<String>,

        /// Override the STF count parameter
        #[arg(long)]
        stf_count: Option<u64>,

        /// Discrete-event simulation instead of real-time
        #[arg(long)]
        no_realtime: bool,
    },

    /// Stop the running workflow
    Stop {
        /// Target a specific execution
        #[arg(long)]
        execution_id: Option<String>,
    },

    /// Ask the runner to log its status
    Status,
}

fn load_namespace(testbed_config: Option<&Path>) -> String {
    let path = swf_agent::bootstrap::testbed_config_path(testbed_config);
    load_testbed_config(&path)
        .ok()
        .and_then(|config| testbed_namespace(&config))
        .unwrap_or_default()
}

pub async fn send(testbed_config: Option<&Path>, command: SendCommand) -> anyhow::Result<()> {
    let namespace = load_namespace(testbed_config);
    let client_id = format!("cmd-sender-{}", std::process::id());
    let (connection, _inbound) =
        Connection::connect(BrokerSettings::from_env(), &client_id).await?;

    let message = match command {
        SendCommand::Run { workflow, config, stf_count, no_realtime } => {
            let mut params = serde_json::Map::new();
            if let Some(stf_count) = stf_count {
                params.insert("stf_count".to_string(), serde_json::json!(stf_count));
            }
            println!("Sending run_workflow: {workflow} (namespace: {namespace})");
            Message::RunWorkflow {
                namespace,
                workflow_name: workflow,
                config,
                realtime: !no_realtime,
                duration: 0.0,
                params,
                timestamp: now_iso(),
            }
        }
        SendCommand::Stop { execution_id } => {
            println!(
                "Sending stop_workflow (execution: {}, namespace: {namespace})",
                execution_id.as_deref().unwrap_or("current")
            );
            Message::StopWorkflow {
                namespace,
                execution_id,
                timestamp: now_iso(),
            }
        }
        SendCommand::Status => {
            println!("Sending status_request (namespace: {namespace})");
            Message::StatusRequest {
                namespace,
                timestamp: now_iso(),
            }
        }
    };

    connection
        .send_json(WORKFLOW_CONTROL_QUEUE, &message, &[])
        .await?;
    connection.disconnect().await;
    Ok(())
}
