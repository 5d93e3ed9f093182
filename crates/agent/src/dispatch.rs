// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound message decoding and namespace filtering.

use swf_core::{Message, Namespace};
use tracing::{debug, warn};

/// Decode a frame body and apply the namespace filter.
///
/// Returns `None` — and MUST cause no side effects beyond logging — when the
/// body is not valid JSON, the message type is unknown, or the namespace tag
/// does not match. Ack mode is auto, so dropped messages are never redelivered.
pub fn decode_filtered(body: &str, namespace: &Namespace) -> Option<Message> {
    let message: Message = match serde_json::from_str(body) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "dropping unparseable message");
            return None;
        }
    };

    if message == Message::Unknown {
        warn!("ignoring unknown message type");
        return None;
    }

    if !namespace.accepts(message.namespace()) {
        debug!(
            msg_type = message.msg_type(),
            message_namespace = message.namespace().unwrap_or(""),
            agent_namespace = %namespace,
            "dropping message from foreign namespace"
        );
        return None;
    }

    debug!(
        msg_type = message.msg_type(),
        run_id = message.run_id(),
        "received message"
    );
    Some(message)
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
