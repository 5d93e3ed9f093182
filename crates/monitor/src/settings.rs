// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor connection settings from the environment.

/// Read once at startup from `SWF_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Authenticated API base, no trailing slash.
    pub base_url: String,
    /// Unauthenticated base for plain HTTP endpoints.
    pub http_url: String,
    pub api_token: Option<String>,
}

impl MonitorSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = get("SWF_MONITOR_URL")
            .unwrap_or_else(|| "http://localhost:8002".to_string())
            .trim_end_matches('/')
            .to_string();
        let http_url = get("SWF_MONITOR_HTTP_URL")
            .unwrap_or_else(|| base_url.clone())
            .trim_end_matches('/')
            .to_string();
        Self {
            base_url,
            http_url,
            api_token: get("SWF_API_TOKEN").filter(|t| !t.is_empty()),
        }
    }

    /// Local development monitors run with self-signed certificates;
    /// certificate verification is disabled for them.
    pub fn is_local(&self) -> bool {
        self.base_url.contains("localhost") || self.base_url.contains("127.0.0.1")
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
