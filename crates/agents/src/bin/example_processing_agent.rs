// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Example processing agent daemon.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use swf_agent::{run_agent, AgentCore};
use swf_agent::bootstrap::{init_tracing, load_testbed, shutdown_token};
use swf_agents::processing::ExampleProcessingAgent;
use swf_broker::{BrokerSettings, Connection};
use swf_monitor::{MonitorClient, MonitorSettings};

const BROADCAST_TOPIC: &str = "/topic/epictopic";

#[derive(Parser)]
#[command(about = "Example processing agent: simulates STF reconstruction")]
struct Args {
    /// Testbed config file (default: $SWF_TESTBED_CONFIG or workflows/testbed.toml)
    #[arg(long)]
    testbed_config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let (namespace, _config) = load_testbed(args.testbed_config.as_deref())?;
    let monitor = Arc::new(MonitorClient::new(&MonitorSettings::from_env())?);
    let core = Arc::new(AgentCore::new(
        "STF_Processing",
        "example",
        namespace,
        Arc::clone(&monitor),
    ));

    let (connection, inbound) =
        Connection::connect(BrokerSettings::from_env(), core.instance_name()).await?;
    let mut handler = ExampleProcessingAgent::new(Arc::clone(&core), monitor);

    run_agent(
        core,
        connection,
        inbound,
        &[BROADCAST_TOPIC],
        &mut handler,
        shutdown_token(),
    )
    .await?;
    Ok(())
}
