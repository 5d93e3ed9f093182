// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! swf-agents: The downstream pipeline agents.
//!
//! Fast-processing (TF slicing and result ingest), fast-monitoring (TF
//! sampling and registration), and a thin example processing consumer.

pub mod fast_processing;
pub mod fastmon;
pub mod processing;

pub use fast_processing::FastProcessingAgent;
pub use fastmon::FastMonAgent;
pub use processing::ExampleProcessingAgent;
