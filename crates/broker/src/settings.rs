// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker connection settings from the environment.

use std::path::PathBuf;

/// Connection parameters, read once at startup from `ACTIVEMQ_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub use_ssl: bool,
    pub ssl_ca_certs: Option<PathBuf>,
}

impl BrokerSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let use_ssl = get("ACTIVEMQ_USE_SSL")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let ssl_ca_certs = get("ACTIVEMQ_SSL_CA_CERTS")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self {
            host: get("ACTIVEMQ_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: get("ACTIVEMQ_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(61612),
            user: get("ACTIVEMQ_USER").unwrap_or_else(|| "admin".to_string()),
            password: get("ACTIVEMQ_PASSWORD").unwrap_or_else(|| "admin".to_string()),
            use_ssl,
            ssl_ca_certs,
        }
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
