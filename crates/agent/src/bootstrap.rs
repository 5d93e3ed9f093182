// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared wiring for agent binaries: tracing, testbed config, shutdown.

use std::path::{Path, PathBuf};
use swf_config::{load_testbed_config, testbed_namespace, ConfigError};
use swf_core::Namespace;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Console logging with `RUST_LOG` override; `--debug` lowers the default.
pub fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Default testbed config location, overridable via `SWF_TESTBED_CONFIG`.
pub fn testbed_config_path(cli_override: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_override {
        return path.to_path_buf();
    }
    std::env::var("SWF_TESTBED_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("workflows/testbed.toml"))
}

/// Load the testbed config and its mandatory namespace.
pub fn load_testbed(cli_override: Option<&Path>) -> Result<(Namespace, toml::Table), ConfigError> {
    let path = testbed_config_path(cli_override);
    let config = load_testbed_config(&path)?;
    let namespace = testbed_namespace(&config).ok_or_else(|| ConfigError::MissingKey {
        section: "testbed".to_string(),
        key: "namespace".to_string(),
    })?;
    info!(config = %path.display(), namespace = %namespace, "testbed config loaded");
    Ok((Namespace::new(namespace), config))
}

/// A token cancelled on SIGINT or SIGTERM.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let signalled = token.clone();
    tokio::spawn(async move {
        let term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate());
        match term {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
        info!("shutdown signal received");
        signalled.cancel();
    });
    token
}
