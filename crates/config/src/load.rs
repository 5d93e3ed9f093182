// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config loading and the three-layer merge.
//!
//! Layering, lowest priority first: included files, the main workflow config,
//! testbed overrides, CLI/command parameter overrides. Includes only add
//! sections the main config lacks; testbed and parameter overrides merge at
//! key level.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// Sections that carry identity or wiring rather than executor parameters.
const SYSTEM_SECTIONS: [&str; 5] = ["workflow", "testbed", "agents", "source", "git_version"];

fn read_table(path: &Path) -> Result<Table, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound { path: path.to_path_buf() });
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    text.parse::<Table>().map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

/// Load a testbed config file (namespace, enabled agents, overrides).
pub fn load_testbed_config(path: &Path) -> Result<Table, ConfigError> {
    read_table(path)
}

fn resolve_config_name(workflow_name: &str, config_name: Option<&str>) -> String {
    match config_name {
        None => format!("{workflow_name}_default.toml"),
        Some(name) if name.ends_with(".toml") => name.to_string(),
        Some(name) => format!("{name}.toml"),
    }
}

/// Load a workflow config with `includes` support.
///
/// Included configs are loaded after the main file; each of their sections is
/// added only when the main config does not already define it (main wins on
/// section-name collision, no deep merge). The `[workflow]` section is never
/// imported from an include.
pub fn load_workflow_config(
    dir: &Path,
    workflow_name: &str,
    config_name: Option<&str>,
) -> Result<Table, ConfigError> {
    let config_file: PathBuf = dir.join(resolve_config_name(workflow_name, config_name));
    let mut config = read_table(&config_file)?;

    let includes: Vec<String> = config
        .get("workflow")
        .and_then(|w| w.get("includes"))
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    for include in includes {
        let included = read_table(&dir.join(&include))?;
        for (section, values) in included {
            if section != "workflow" && !config.contains_key(&section) {
                config.insert(section, values);
            }
        }
    }

    Ok(config)
}

/// Apply testbed config sections over a workflow config.
///
/// Every section is applied, `[testbed]` included (executors read the
/// namespace from it). Sections present in both merge key by key with the
/// testbed value winning.
pub fn apply_testbed_overrides(config: &mut Table, testbed: &Table) {
    for (section, values) in testbed {
        let Some(values) = values.as_table() else {
            continue;
        };
        match config.get_mut(section).and_then(Value::as_table_mut) {
            Some(existing) => {
                for (key, value) in values {
                    existing.insert(key.clone(), value.clone());
                }
            }
            None => {
                config.insert(section.clone(), Value::Table(values.clone()));
            }
        }
    }
}

fn json_to_toml(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Integer(i))
            } else {
                n.as_f64().map(Value::Float)
            }
        }
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Array(items) => Some(Value::Array(
            items.iter().filter_map(json_to_toml).collect(),
        )),
        serde_json::Value::Object(map) => {
            let mut table = Table::new();
            for (k, v) in map {
                if let Some(v) = json_to_toml(v) {
                    table.insert(k.clone(), v);
                }
            }
            Some(Value::Table(table))
        }
        serde_json::Value::Null => None,
    }
}

/// Apply command parameter overrides (highest priority).
///
/// A parameter key replaces the value in every non-`[workflow]` section that
/// already defines that key; unknown keys are ignored.
pub fn apply_param_overrides(config: &mut Table, params: &serde_json::Map<String, serde_json::Value>) {
    if params.is_empty() {
        return;
    }
    for (section, values) in config.iter_mut() {
        if section == "workflow" {
            continue;
        }
        let Some(values) = values.as_table_mut() else {
            continue;
        };
        for (key, value) in params {
            if values.contains_key(key) {
                if let Some(v) = json_to_toml(value) {
                    values.insert(key.clone(), v);
                } else {
                    tracing::warn!(key = key.as_str(), "ignoring null parameter override");
                }
            }
        }
    }
}

/// Fold all parameter sections into one table for executor consumption.
///
/// `[daq_state_machine]` is the base; every other non-system section merges
/// over it in iteration order, so overrides apply regardless of which section
/// carries them.
pub fn merged_params(config: &Table) -> Table {
    let mut merged = config
        .get("daq_state_machine")
        .and_then(Value::as_table)
        .cloned()
        .unwrap_or_default();
    for (section, values) in config {
        if SYSTEM_SECTIONS.contains(&section.as_str()) || section == "daq_state_machine" {
            continue;
        }
        if let Some(values) = values.as_table() {
            for (key, value) in values {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

/// The fully-expanded config stored with a workflow definition: workflow
/// identity (minus the `includes` directive) plus every parameter section.
pub fn expanded_parameter_values(config: &Table) -> serde_json::Value {
    let mut expanded = serde_json::Map::new();

    let mut workflow = serde_json::Map::new();
    if let Some(section) = config.get("workflow").and_then(Value::as_table) {
        for key in ["name", "version", "description"] {
            if let Some(value) = section.get(key) {
                if let Ok(v) = serde_json::to_value(value) {
                    workflow.insert(key.to_string(), v);
                }
            }
        }
    }
    expanded.insert("workflow".to_string(), serde_json::Value::Object(workflow));

    for (section, values) in config {
        if section == "workflow" || !values.is_table() {
            continue;
        }
        if let Ok(v) = serde_json::to_value(values) {
            expanded.insert(section.clone(), v);
        }
    }

    serde_json::Value::Object(expanded)
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
