// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! swf-broker: STOMP transport to the message broker.
//!
//! Wire format: STOMP 1.1/1.2 frames over TCP or TLS. Incoming MESSAGE
//! frames are funneled through a single channel so handler code runs on the
//! agent's loop, never on the transport's I/O task.

mod connection;
mod frame;
mod publisher;
mod settings;

pub use connection::{Connection, Inbound, TransportError};
pub use frame::{read_frame, Frame, FrameError};
pub use publisher::{broadcast_headers, slice_headers, Publisher};
pub use settings::BrokerSettings;

#[cfg(any(test, feature = "test-support"))]
pub use publisher::FakePublisher;
