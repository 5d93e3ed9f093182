// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! swf-core: Domain types for the streaming-workflow testbed control plane.
//!
//! Message envelopes, Monitor record types, run/slice naming, and the clock
//! abstraction shared by every agent crate.

pub mod clock;
pub mod message;
pub mod namespace;
pub mod naming;
pub mod records;
pub mod slice;
pub mod state;

pub use clock::{Clock, FakeClock, SystemClock};
pub use message::{Message, WorkerMessage};
pub use namespace::Namespace;
pub use naming::{fastmon_tf_filename, slice_tf_filename, stf_basename, stf_filename};
pub use records::{
    ExecutionStatus, FastMonFile, FastMonFileRow, HeartbeatPayload, NewWorkflowDefinition,
    NewWorkflowExecution, RunPhase, RunState, SliceStatus, SystemStateEvent, TfFileStatus, TfSlice,
    TfSliceRow, WorkflowDefinitionRow, WorkflowExecutionRow,
};
pub use slice::{plan_slices, SliceBounds, SliceContent, SliceMessage, SliceResultContent};
pub use state::{agent_instance_name, OperationalState};

/// ISO-8601 timestamp for the current instant, the format every wire message
/// and Monitor record uses.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
