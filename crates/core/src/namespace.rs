// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Namespace: the logical isolation boundary.
//!
//! Every broadcast message and every persisted record carries a namespace.
//! Agents honor only messages tagged with their own namespace; control-plane
//! messages on user-scoped queues are exempt.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical isolation tag loaded once from `[testbed].namespace`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(ns: impl Into<String>) -> Self {
        Self(ns.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a received message belongs to this namespace.
    ///
    /// Messages without a namespace tag pass the filter: result-queue traffic
    /// from external workers is routed by destination, not by tag.
    pub fn accepts(&self, message_namespace: Option<&str>) -> bool {
        match message_namespace {
            Some(ns) if !ns.is_empty() => ns == self.0,
            _ => true,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Namespace {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Namespace {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
#[path = "namespace_tests.rs"]
mod tests;
