// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;

fn write_config(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).unwrap();
}

fn workflow_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        "stf_datataking_default.toml",
        r#"
[workflow]
name = "stf_datataking"
version = "0.1"
includes = ["daq_state_machine.toml", "fast_processing_default.toml"]

[daq_state_machine]
stf_interval = 1.0
stf_count = 10
"#,
    );
    write_config(
        dir.path(),
        "daq_state_machine.toml",
        r#"
[daq_state_machine]
stf_interval = 99.0
standby_duration = 5

[beam_model]
ramp_seconds = 30
"#,
    );
    write_config(
        dir.path(),
        "fast_processing_default.toml",
        r#"
[workflow]
name = "fast_processing"
version = "9.9"

[fast_processing]
slices_per_sample = 15
stf_sampling_rate = 0.1
"#,
    );
    dir
}

#[test]
fn includes_add_sections_without_overwriting() {
    let dir = workflow_dir();
    let config = load_workflow_config(dir.path(), "stf_datataking", None).unwrap();

    // Main config wins on section collision: stf_interval stays 1.0.
    let daq = config["daq_state_machine"].as_table().unwrap();
    assert_eq!(daq["stf_interval"].as_float(), Some(1.0));
    // Sections absent from main are added whole.
    assert!(config.contains_key("beam_model"));
    assert!(config.contains_key("fast_processing"));
    // [workflow] is never imported from an include.
    assert_eq!(config["workflow"]["name"].as_str(), Some("stf_datataking"));
}

#[test]
fn named_config_gets_toml_suffix() {
    let dir = workflow_dir();
    write_config(
        dir.path(),
        "short_run.toml",
        "[workflow]\nname = \"stf_datataking\"\nversion = \"0.1\"\n",
    );
    assert!(load_workflow_config(dir.path(), "stf_datataking", Some("short_run")).is_ok());
    assert!(load_workflow_config(dir.path(), "stf_datataking", Some("short_run.toml")).is_ok());
}

#[test]
fn missing_config_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_workflow_config(dir.path(), "nope", None).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

#[test]
fn missing_include_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        "w_default.toml",
        "[workflow]\nname = \"w\"\nversion = \"1\"\nincludes = [\"gone.toml\"]\n",
    );
    let err = load_workflow_config(dir.path(), "w", None).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

#[test]
fn testbed_overrides_merge_by_key() {
    let dir = workflow_dir();
    let mut config = load_workflow_config(dir.path(), "stf_datataking", None).unwrap();

    let testbed: Table = r#"
[testbed]
namespace = "alice"

[daq_state_machine]
stf_count = 3
"#
    .parse()
    .unwrap();
    apply_testbed_overrides(&mut config, &testbed);

    assert_eq!(config["testbed"]["namespace"].as_str(), Some("alice"));
    let daq = config["daq_state_machine"].as_table().unwrap();
    assert_eq!(daq["stf_count"].as_integer(), Some(3));
    // Untouched keys survive the merge.
    assert_eq!(daq["stf_interval"].as_float(), Some(1.0));
}

#[test]
fn param_overrides_hit_every_matching_section() {
    let dir = workflow_dir();
    let mut config = load_workflow_config(dir.path(), "stf_datataking", None).unwrap();

    let mut params = serde_json::Map::new();
    params.insert("stf_count".to_string(), serde_json::json!(7));
    params.insert("slices_per_sample".to_string(), serde_json::json!(4));
    params.insert("unknown_key".to_string(), serde_json::json!(1));
    apply_param_overrides(&mut config, &params);

    assert_eq!(
        config["daq_state_machine"]["stf_count"].as_integer(),
        Some(7)
    );
    assert_eq!(
        config["fast_processing"]["slices_per_sample"].as_integer(),
        Some(4)
    );
    // Unknown keys never create new entries.
    assert!(!config["daq_state_machine"]
        .as_table()
        .unwrap()
        .contains_key("unknown_key"));
}

#[test]
fn merged_params_fold_over_daq_base() {
    let config: Table = r#"
[workflow]
name = "stf_datataking"
version = "0.1"

[testbed]
namespace = "alice"

[daq_state_machine]
stf_interval = 1.0
stf_count = 10

[stf_processing]
stf_count = 3
extra = "kept"
"#
    .parse()
    .unwrap();

    let merged = merged_params(&config);
    // Later parameter sections override the base.
    assert_eq!(merged["stf_count"].as_integer(), Some(3));
    assert_eq!(merged["stf_interval"].as_float(), Some(1.0));
    assert_eq!(merged["extra"].as_str(), Some("kept"));
    // System sections never leak into the fold.
    assert!(!merged.contains_key("namespace"));
}

#[test]
fn expanded_values_drop_the_includes_directive() {
    let dir = workflow_dir();
    let config = load_workflow_config(dir.path(), "stf_datataking", None).unwrap();
    let expanded = expanded_parameter_values(&config);

    assert_eq!(expanded["workflow"]["name"], "stf_datataking");
    assert_eq!(expanded["workflow"]["version"], "0.1");
    assert!(expanded["workflow"].get("includes").is_none());
    assert_eq!(expanded["daq_state_machine"]["stf_count"], 10);
    assert_eq!(expanded["fast_processing"]["slices_per_sample"], 15);
}

#[test]
fn reload_of_serialized_config_is_identical() {
    let dir = workflow_dir();
    let config = load_workflow_config(dir.path(), "stf_datataking", None).unwrap();

    let serialized = toml::to_string(&config).unwrap();
    let reloaded: Table = serialized.parse().unwrap();
    assert_eq!(reloaded, config);
    // And serializing again is byte-identical.
    assert_eq!(toml::to_string(&reloaded).unwrap(), serialized);
}
