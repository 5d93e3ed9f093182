// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Publishing seam between agents and the transport.

use crate::connection::{Connection, TransportError};
use async_trait::async_trait;
use serde_json::Value;

/// 12 hours, the TTL the transformer queue requires on slice traffic.
const SLICE_TTL_MS: u64 = 12 * 3600 * 1000;

/// Headers for durable slice messages on the transformer queue.
pub fn slice_headers(run_id: u64) -> Vec<(String, String)> {
    vec![
        ("persistent".to_string(), "true".to_string()),
        ("ttl".to_string(), SLICE_TTL_MS.to_string()),
        ("vo".to_string(), "eic".to_string()),
        ("msg_type".to_string(), "slice".to_string()),
        ("run_id".to_string(), run_id.to_string()),
    ]
}

/// Headers for transient lifecycle broadcasts.
pub fn broadcast_headers(msg_type: &str, namespace: &str, run_id: u64) -> Vec<(String, String)> {
    vec![
        ("persistent".to_string(), "false".to_string()),
        ("vo".to_string(), "eic".to_string()),
        ("msg_type".to_string(), msg_type.to_string()),
        ("namespace".to_string(), namespace.to_string()),
        ("run_id".to_string(), run_id.to_string()),
    ]
}

/// Message publishing as the workflow executors and agents see it.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(
        &self,
        destination: &str,
        body: Value,
        headers: &[(String, String)],
    ) -> Result<(), TransportError>;
}

#[async_trait]
impl Publisher for Connection {
    async fn publish(
        &self,
        destination: &str,
        body: Value,
        headers: &[(String, String)],
    ) -> Result<(), TransportError> {
        self.send_json(destination, &body, headers).await
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePublisher;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Records published messages for assertions.
    #[derive(Clone, Default)]
    pub struct FakePublisher {
        published: Arc<Mutex<Vec<(String, Value, Vec<(String, String)>)>>>,
        failing: Arc<AtomicBool>,
    }

    impl FakePublisher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make subsequent publishes fail, to exercise best-effort paths.
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// All published messages, in publish order.
        pub fn published(&self) -> Vec<(String, Value, Vec<(String, String)>)> {
            self.published.lock().clone()
        }

        /// Messages published to one destination.
        pub fn to_destination(&self, destination: &str) -> Vec<Value> {
            self.published
                .lock()
                .iter()
                .filter(|(d, _, _)| d == destination)
                .map(|(_, v, _)| v.clone())
                .collect()
        }

        /// `msg_type` tags published to one destination, in order.
        pub fn msg_types(&self, destination: &str) -> Vec<String> {
            self.to_destination(destination)
                .iter()
                .filter_map(|v| v.get("msg_type"))
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        }
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn publish(
            &self,
            destination: &str,
            body: Value,
            headers: &[(String, String)],
        ) -> Result<(), TransportError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(TransportError::NotConnected);
            }
            self.published
                .lock()
                .push((destination.to_string(), body, headers.to_vec()));
            Ok(())
        }
    }
}
