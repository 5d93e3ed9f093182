// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed views over config sections.
//!
//! Configs stay as `toml::Table` end to end (the runner passes them whole to
//! executors and stores them as execution parameter values); these views give
//! each component a validated window onto the sections it cares about.

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize};
use toml::Table;

/// Accept TOML integers where a float parameter is expected.
fn float_param<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    let value = toml::Value::deserialize(de)?;
    match value {
        toml::Value::Float(f) => Ok(f),
        toml::Value::Integer(i) => Ok(i as f64),
        other => Err(serde::de::Error::custom(format!(
            "expected number, got {}",
            other.type_str()
        ))),
    }
}

/// Deserialize a named section into a typed view, applying the view's
/// defaults for missing keys. A missing section yields all defaults.
pub fn section<T: Default + for<'de> Deserialize<'de>>(
    config: &Table,
    name: &str,
) -> Result<T, ConfigError> {
    match config.get(name) {
        Some(value) => value
            .clone()
            .try_into()
            .map_err(|source| ConfigError::Section {
                section: name.to_string(),
                source: Box::new(source),
            }),
        None => Ok(T::default()),
    }
}

/// Deserialize an already-merged parameter table into a typed view.
pub fn params_view<T: Default + for<'de> Deserialize<'de>>(
    params: &Table,
) -> Result<T, ConfigError> {
    toml::Value::Table(params.clone())
        .try_into()
        .map_err(|source| ConfigError::Section {
            section: "merged parameters".to_string(),
            source: Box::new(source),
        })
}

/// `[testbed].namespace`, when configured.
pub fn testbed_namespace(config: &Table) -> Option<String> {
    config
        .get("testbed")?
        .get("namespace")?
        .as_str()
        .map(str::to_string)
}

/// Keys of `[agents.<name>]` tables with `enabled = true`, sorted for
/// deterministic startup order.
pub fn enabled_agents(config: &Table) -> Vec<String> {
    let Some(agents) = config.get("agents").and_then(|v| v.as_table()) else {
        return Vec::new();
    };
    let mut enabled: Vec<String> = agents
        .iter()
        .filter(|(_, conf)| {
            conf.get("enabled")
                .and_then(toml::Value::as_bool)
                .unwrap_or(false)
        })
        .map(|(name, _)| name.clone())
        .collect();
    enabled.sort();
    enabled
}

/// `[workflow]` section of a workflow config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSection {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    /// Config name the orchestrator passes along with `run_workflow`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(default = "default_realtime")]
    pub realtime: bool,
}

fn default_realtime() -> bool {
    true
}

impl WorkflowSection {
    pub fn from_config(config: &Table) -> Result<Self, ConfigError> {
        let value = config
            .get("workflow")
            .ok_or_else(|| ConfigError::MissingSection {
                section: "workflow".to_string(),
            })?;
        value
            .clone()
            .try_into()
            .map_err(|source| ConfigError::Section {
                section: "workflow".to_string(),
                source: Box::new(source),
            })
    }
}

/// `[daq_state_machine]` parameters driving the DAQ sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaqParams {
    #[serde(deserialize_with = "float_param")]
    pub no_beam_not_ready_delay: f64,
    #[serde(deserialize_with = "float_param")]
    pub broadcast_delay: f64,
    #[serde(deserialize_with = "float_param")]
    pub beam_not_ready_delay: f64,
    #[serde(deserialize_with = "float_param")]
    pub beam_ready_delay: f64,
    /// 0 means infinite periods (run until stopped).
    pub physics_period_count: u32,
    #[serde(deserialize_with = "float_param")]
    pub physics_period_duration: f64,
    #[serde(deserialize_with = "float_param")]
    pub stf_interval: f64,
    #[serde(deserialize_with = "float_param")]
    pub stf_generation_time: f64,
    /// Count-based generation when set; duration-based otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stf_count: Option<u64>,
    #[serde(deserialize_with = "float_param")]
    pub standby_duration: f64,
    #[serde(deserialize_with = "float_param")]
    pub beam_not_ready_end_delay: f64,
}

impl Default for DaqParams {
    fn default() -> Self {
        Self {
            no_beam_not_ready_delay: 5.0,
            broadcast_delay: 0.1,
            beam_not_ready_delay: 2.0,
            beam_ready_delay: 1.0,
            physics_period_count: 0,
            physics_period_duration: 60.0,
            stf_interval: 1.0,
            stf_generation_time: 0.05,
            stf_count: None,
            standby_duration: 5.0,
            beam_not_ready_end_delay: 2.0,
        }
    }
}

/// `[fast_processing]` parameters for the TF slicing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastProcessingParams {
    #[serde(deserialize_with = "float_param")]
    pub stf_sampling_rate: f64,
    pub slices_per_sample: u32,
    pub target_worker_count: u32,
    #[serde(deserialize_with = "float_param")]
    pub worker_rampup_time: f64,
    #[serde(deserialize_with = "float_param")]
    pub worker_rampdown_time: f64,
    #[serde(deserialize_with = "float_param")]
    pub slice_processing_time: f64,
    /// TFs per STF; sized for the simulated record format.
    pub tfs_per_stf: u32,
}

impl Default for FastProcessingParams {
    fn default() -> Self {
        Self {
            stf_sampling_rate: 0.1,
            slices_per_sample: 15,
            target_worker_count: 10,
            worker_rampup_time: 30.0,
            worker_rampdown_time: 30.0,
            slice_processing_time: 5.0,
            tfs_per_stf: 1000,
        }
    }
}

impl FastProcessingParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.stf_sampling_rate) {
            return Err(ConfigError::InvalidRange {
                key: "stf_sampling_rate".to_string(),
                value: self.stf_sampling_rate,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

/// `[fastmon]` parameters for TF subsampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastMonParams {
    /// Fraction of STFs sampled into TFs.
    #[serde(deserialize_with = "float_param")]
    pub selection_fraction: f64,
    pub tf_files_per_stf: u32,
    /// Fraction of the STF size each TF takes.
    #[serde(deserialize_with = "float_param")]
    pub tf_size_fraction: f64,
    pub tf_sequence_start: u32,
}

impl Default for FastMonParams {
    fn default() -> Self {
        Self {
            selection_fraction: 0.1,
            tf_files_per_stf: 7,
            tf_size_fraction: 0.15,
            tf_sequence_start: 1,
        }
    }
}

impl FastMonParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.selection_fraction) {
            return Err(ConfigError::InvalidRange {
                key: "selection_fraction".to_string(),
                value: self.selection_fraction,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
