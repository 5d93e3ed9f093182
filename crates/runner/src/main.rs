// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow runner daemon.
//!
//! Persistent mode (default) listens for workflow commands on the
//! workflow-control queue. `--run-once` executes a single workflow and
//! exits.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use swf_agent::bootstrap::{init_tracing, load_testbed, shutdown_token};
use swf_agent::{run_agent, AgentCore, MessageHandler};
use swf_broker::{BrokerSettings, Connection};
use swf_core::{Message, OperationalState};
use swf_monitor::{MonitorClient, MonitorSettings};
use swf_runner::lifecycle::username;
use swf_runner::WorkflowRunnerAgent;

const WORKFLOW_CONTROL_QUEUE: &str = "/queue/workflow_control";

#[derive(Parser)]
#[command(about = "Workflow runner: loads, registers, and executes workflows")]
struct Args {
    /// Testbed config file (default: $SWF_TESTBED_CONFIG or workflows/testbed.toml)
    #[arg(long)]
    testbed_config: Option<PathBuf>,

    /// Directory holding workflow config files
    #[arg(long, default_value = "workflows")]
    workflows_dir: PathBuf,

    /// Execute this workflow once and exit instead of listening
    #[arg(long, value_name = "WORKFLOW")]
    run_once: Option<String>,

    /// Workflow config name (with --run-once)
    #[arg(long)]
    config: Option<String>,

    /// Discrete-event simulation instead of real-time (with --run-once)
    #[arg(long)]
    no_realtime: bool,

    /// Simulation duration limit in seconds, 0 = unbounded (with --run-once)
    #[arg(long, default_value_t = 0.0)]
    duration: f64,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let (namespace, testbed) = load_testbed(args.testbed_config.as_deref())?;
    let monitor = Arc::new(MonitorClient::new(&MonitorSettings::from_env())?);

    let agent_type = args
        .run_once
        .clone()
        .unwrap_or_else(|| "workflow_runner".to_string());
    let core = Arc::new(AgentCore::new(
        &agent_type,
        "runner",
        namespace,
        Arc::clone(&monitor),
    ));

    let (connection, inbound) =
        Connection::connect(BrokerSettings::from_env(), core.instance_name()).await?;

    let mut agent = WorkflowRunnerAgent::new(
        Arc::clone(&core),
        Arc::new(connection.clone()),
        monitor,
        args.workflows_dir.clone(),
        testbed,
        username(),
    );

    if let Some(workflow_name) = args.run_once.clone() {
        run_once(&core, &mut agent, workflow_name, &args).await;
        core.set_exited().await;
        connection.disconnect().await;
        return Ok(());
    }

    run_agent(
        core,
        connection,
        inbound,
        &[WORKFLOW_CONTROL_QUEUE],
        &mut agent,
        shutdown_token(),
    )
    .await?;
    Ok(())
}

/// Drive a single workflow to completion through the normal command path.
async fn run_once(
    core: &Arc<AgentCore<MonitorClient>>,
    agent: &mut WorkflowRunnerAgent<MonitorClient>,
    workflow_name: String,
    args: &Args,
) {
    let command = Message::RunWorkflow {
        namespace: core.namespace().as_str().to_string(),
        workflow_name,
        config: args.config.clone(),
        realtime: !args.no_realtime,
        duration: args.duration,
        params: serde_json::Map::new(),
        timestamp: swf_core::now_iso(),
    };
    if let Err(e) = agent.handle(command).await {
        tracing::error!(error = %e, "failed to start workflow");
        return;
    }
    // The workflow runs in a background task; wait for the agent to go idle.
    loop {
        tokio::time::sleep(Duration::from_millis(200)).await;
        if core.state() == OperationalState::Ready {
            break;
        }
    }
}
