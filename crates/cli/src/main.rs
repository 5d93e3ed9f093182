// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! testbed: operator CLI for the streaming-workflow testbed.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "testbed", about = "Streaming-workflow testbed control")]
struct Cli {
    /// Testbed config file (default: $SWF_TESTBED_CONFIG or workflows/testbed.toml)
    #[arg(long, global = true)]
    testbed_config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start agents under supervisord and trigger the configured workflow
    Run {
        /// Config name (default: testbed.toml)
        config: Option<String>,
    },

    /// Send a command to the workflow runner
    Send {
        #[command(subcommand)]
        command: commands::send::SendCommand,
    },

    /// Run the per-user agent manager daemon
    AgentManager {
        /// Testbed checkout directory holding the supervisord config
        #[arg(long, default_value = ".")]
        testbed_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    swf_agent::bootstrap::init_tracing(cli.debug);

    match cli.command {
        Command::Run { config } => commands::run::run(config.as_deref()).await,
        Command::Send { command } => {
            commands::send::send(cli.testbed_config.as_deref(), command).await
        }
        Command::AgentManager { testbed_dir } => commands::run::agent_manager(testbed_dir).await,
    }
}
