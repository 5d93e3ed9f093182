// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestration: start agents under supervisord and trigger the workflow.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use swf_broker::{BrokerSettings, Connection};
use swf_config::{enabled_agents, load_testbed_config, testbed_namespace, WorkflowSection};
use swf_core::{now_iso, Message};
use swf_manager::{program_for, SupervisorControl, SupervisordControl, UserAgentManager};
use swf_monitor::{MonitorClient, MonitorSettings};

const AGENTS_CONF: &str = "agents.supervisord.conf";
const WORKFLOW_CONTROL_QUEUE: &str = "/queue/workflow_control";

/// `testbed run [config]`: load the config, bring up the workflow runner
/// and the enabled agents, then publish `run_workflow`.
pub async fn run(config_name: Option<&str>) -> anyhow::Result<()> {
    let workflows_dir = PathBuf::from("workflows");
    let config_path = match config_name {
        None => workflows_dir.join("testbed.toml"),
        Some(name) if name.ends_with(".toml") => workflows_dir.join(name),
        Some(name) => workflows_dir.join(format!("{name}.toml")),
    };
    let config = load_testbed_config(&config_path)?;

    let Some(namespace) = testbed_namespace(&config) else {
        anyhow::bail!("namespace not set in [testbed] section of {}", config_path.display());
    };
    println!("Namespace: {namespace}");

    let supervisor = SupervisordControl::new(PathBuf::from(AGENTS_CONF), PathBuf::from("."));
    supervisor.ensure_running().await?;

    println!("Starting workflow runner...");
    supervisor.start_program("workflow-runner").await?;
    tokio::time::sleep(Duration::from_secs(2)).await;

    println!("Starting agents...");
    let agents = enabled_agents(&config);
    if agents.is_empty() {
        println!("Warning: no agents enabled in configuration");
    }
    for agent in &agents {
        match program_for(agent) {
            Some(program) => {
                supervisor.start_program(program).await?;
                println!("  {program}: started");
            }
            None => println!("  {agent}: unknown agent, skipped"),
        }
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    // The workflow identity comes from the loaded config when present.
    let (workflow_name, workflow_config, realtime) = match WorkflowSection::from_config(&config) {
        Ok(workflow) => (workflow.name, workflow.config, workflow.realtime),
        Err(_) => ("stf_datataking".to_string(), None, true),
    };

    println!("Triggering workflow '{workflow_name}'...");
    let client_id = format!("testbed-run-{}", std::process::id());
    let (connection, _inbound) =
        Connection::connect(BrokerSettings::from_env(), &client_id).await?;
    connection
        .send_json(
            WORKFLOW_CONTROL_QUEUE,
            &Message::RunWorkflow {
                namespace,
                workflow_name: workflow_name.clone(),
                config: workflow_config,
                realtime,
                duration: 0.0,
                params: serde_json::Map::new(),
                timestamp: now_iso(),
            },
            &[],
        )
        .await?;
    connection.disconnect().await;

    println!("Workflow '{workflow_name}' triggered. Use 'testbed status' to monitor.");
    Ok(())
}

/// `testbed agent-manager`: the per-user control daemon.
pub async fn agent_manager(testbed_dir: PathBuf) -> anyhow::Result<()> {
    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    let monitor = Arc::new(MonitorClient::new(&MonitorSettings::from_env())?);
    let supervisor = Arc::new(SupervisordControl::new(
        testbed_dir.join(AGENTS_CONF),
        &testbed_dir,
    ));

    let client_id = format!("agent-manager-{username}");
    let (connection, inbound) = Connection::connect(BrokerSettings::from_env(), &client_id).await?;

    let mut manager = UserAgentManager::new(
        &username,
        testbed_dir,
        monitor,
        Arc::new(connection.clone()),
        supervisor,
    );
    manager
        .run(connection, inbound, swf_agent::bootstrap::shutdown_token())
        .await?;
    Ok(())
}
