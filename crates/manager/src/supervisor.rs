// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! supervisord process orchestration.
//!
//! All agent processes run under one supervisord instance per user;
//! the manager drives it through `supervisorctl`.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::info;

/// supervisorctl exit code when it cannot connect (daemon not running).
const CANNOT_CONNECT: i32 = 4;

/// Map from testbed config agent keys to supervisord program names.
const AGENT_PROGRAM_MAP: [(&str, &str); 4] = [
    ("data", "example-data-agent"),
    ("processing", "example-processing-agent"),
    ("fastmon", "example-fastmon-agent"),
    ("fast_processing", "fast-processing-agent"),
];

/// The supervisord program name for a testbed agent key.
pub fn program_for(agent: &str) -> Option<&'static str> {
    AGENT_PROGRAM_MAP
        .iter()
        .find(|(key, _)| *key == agent)
        .map(|(_, program)| *program)
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to run {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {detail}")]
    Failed { command: String, detail: String },
}

/// Process orchestration as the manager sees it.
#[async_trait]
pub trait SupervisorControl: Send + Sync {
    /// Start supervisord when it is not already running.
    async fn ensure_running(&self) -> Result<(), SupervisorError>;
    async fn start_program(&self, program: &str) -> Result<(), SupervisorError>;
    async fn stop_all(&self) -> Result<(), SupervisorError>;
    async fn status(&self) -> Result<String, SupervisorError>;
}

/// Real supervisord, driven through `supervisorctl -c <conf>`.
pub struct SupervisordControl {
    conf_path: PathBuf,
    working_dir: PathBuf,
}

impl SupervisordControl {
    pub fn new(conf_path: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            conf_path: conf_path.into(),
            working_dir: working_dir.into(),
        }
    }

    async fn run(&self, binary: &str, args: &[&str]) -> Result<Output, SupervisorError> {
        let command_line = format!("{binary} {}", args.join(" "));
        Command::new(binary)
            .arg("-c")
            .arg(&self.conf_path)
            .args(args)
            .current_dir(&self.working_dir)
            .output()
            .await
            .map_err(|source| SupervisorError::Io {
                command: command_line,
                source,
            })
    }

    async fn supervisorctl(&self, args: &[&str]) -> Result<Output, SupervisorError> {
        self.run("supervisorctl", args).await
    }
}

#[async_trait]
impl SupervisorControl for SupervisordControl {
    async fn ensure_running(&self) -> Result<(), SupervisorError> {
        let output = self.supervisorctl(&["status"]).await?;
        if output.status.code() != Some(CANNOT_CONNECT) {
            return Ok(());
        }

        info!("starting supervisord");
        let output = self.run("supervisord", &[]).await?;
        if !output.status.success() {
            return Err(SupervisorError::Failed {
                command: "supervisord".to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        // Give it a moment to bind its control socket.
        tokio::time::sleep(Duration::from_secs(1)).await;
        Ok(())
    }

    async fn start_program(&self, program: &str) -> Result<(), SupervisorError> {
        let output = self.supervisorctl(&["start", program]).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() || stdout.to_lowercase().contains("already started") {
            info!(program, "started");
            return Ok(());
        }
        Err(SupervisorError::Failed {
            command: format!("supervisorctl start {program}"),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    async fn stop_all(&self) -> Result<(), SupervisorError> {
        let output = self.supervisorctl(&["stop", "all"]).await?;
        // Cannot-connect means everything is already down.
        match output.status.code() {
            Some(0) | Some(CANNOT_CONNECT) => Ok(()),
            _ => Err(SupervisorError::Failed {
                command: "supervisorctl stop all".to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    async fn status(&self) -> Result<String, SupervisorError> {
        let output = self.supervisorctl(&["status"]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
