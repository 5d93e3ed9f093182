// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! swf-config: Layered TOML configuration for workflows and the testbed.
//!
//! Workflow configs use descriptive section names (`[daq_state_machine]`,
//! `[fast_processing]`); an `includes` list in `[workflow]` pulls in sections
//! from sibling files without overwriting the main config. Executors discover
//! and merge the sections that apply to them.

mod error;
mod load;
mod model;

pub use error::ConfigError;
pub use load::{
    apply_param_overrides, apply_testbed_overrides, expanded_parameter_values, load_testbed_config,
    load_workflow_config, merged_params,
};
pub use model::{
    enabled_agents, params_view, section, testbed_namespace, DaqParams, FastMonParams,
    FastProcessingParams, WorkflowSection,
};
