// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user agent manager daemon.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use swf_agent::bootstrap::shutdown_token;
use swf_broker::{BrokerSettings, Connection};
use swf_manager::{SupervisordControl, UserAgentManager};
use swf_monitor::{MonitorClient, MonitorSettings};

const AGENTS_CONF: &str = "agents.supervisord.conf";

/// Console plus a rolling file in the temp dir, so `restart` survivors leave
/// a trail. The guard must stay alive for the file writer to flush.
fn init_logging(debug: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let default = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let file = tracing_appender::rolling::never(std::env::temp_dir(), "swf-agent-manager.log");
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}

#[derive(Parser)]
#[command(about = "Per-user agent manager: testbed control over the broker")]
struct Args {
    /// Testbed checkout directory holding the supervisord config
    #[arg(long, default_value = ".")]
    testbed_dir: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.debug);

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    let monitor = Arc::new(MonitorClient::new(&MonitorSettings::from_env())?);
    let supervisor = Arc::new(SupervisordControl::new(
        args.testbed_dir.join(AGENTS_CONF),
        &args.testbed_dir,
    ));

    let client_id = format!("agent-manager-{username}");
    let (connection, inbound) = Connection::connect(BrokerSettings::from_env(), &client_id).await?;

    let mut manager = UserAgentManager::new(
        &username,
        args.testbed_dir,
        monitor,
        Arc::new(connection.clone()),
        supervisor,
    );
    manager.run(connection, inbound, shutdown_token()).await?;
    Ok(())
}
