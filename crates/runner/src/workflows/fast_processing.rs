// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fast-processing simulation workflow.
//!
//! A single-run sequence: announce the run so workers can ramp up, generate
//! TF samples at the configured rate for the run duration, then end the run
//! and leave time for worker rampdown.

use crate::error::WorkflowError;
use crate::executor::{Step, WorkflowEnv, WorkflowExecutor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swf_config::{merged_params, params_view, testbed_namespace};
use swf_core::{now_iso, Message, Namespace};

const DEFINITION: &str = "\
fast_processing: fast-processing pipeline simulation.
run_imminent (worker rampup) -> start_run -> data_ready TF samples at
stf_rate for run_duration seconds -> end_run (worker rampdown).";

const BROADCAST_TICK: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastProcessingSimParams {
    pub run_duration: f64,
    pub stf_rate: f64,
    pub broadcast_delay: f64,
    pub run_imminent_delay: f64,
    pub worker_rampdown_time: f64,
    pub slices_per_sample: u32,
    pub target_worker_count: u32,
}

impl Default for FastProcessingSimParams {
    fn default() -> Self {
        Self {
            run_duration: 60.0,
            stf_rate: 1.0,
            broadcast_delay: 0.1,
            run_imminent_delay: 30.0,
            worker_rampdown_time: 30.0,
            slices_per_sample: 15,
            target_worker_count: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    AfterImminent,
    Rampup,
    StartRunBroadcast,
    AfterStartRun,
    SampleNext,
    SampleBroadcast,
    SampleSpacing,
    EndBroadcast,
    AfterEnd,
    Rampdown,
    Finished,
}

pub struct FastProcessingExecutor {
    params: FastProcessingSimParams,
    namespace: Namespace,
    phase: Phase,
    run_id: u64,
    sample_count: u64,
    slice_count: u64,
    run_started_at: f64,
}

impl FastProcessingExecutor {
    pub fn from_config(config: &toml::Table) -> Result<Self, WorkflowError> {
        let params: FastProcessingSimParams = params_view(&merged_params(config))?;
        let namespace = Namespace::new(testbed_namespace(config).unwrap_or_default());
        Ok(Self {
            params,
            namespace,
            phase: Phase::Start,
            run_id: 0,
            sample_count: 0,
            slice_count: 0,
            run_started_at: 0.0,
        })
    }

    fn sample_interval(&self) -> f64 {
        if self.params.stf_rate > 0.0 {
            1.0 / self.params.stf_rate
        } else {
            self.params.run_duration.max(1.0)
        }
    }
}

#[async_trait]
impl WorkflowExecutor for FastProcessingExecutor {
    fn definition(&self) -> &'static str {
        DEFINITION
    }

    async fn step(&mut self, env: &mut WorkflowEnv) -> Result<Step, WorkflowError> {
        let tick = env.tick();
        match self.phase {
            Phase::Start => {
                self.run_id = env.monitor.next_run_number().await?;
                env.broadcast(&Message::RunImminent {
                    namespace: self.namespace.as_str().to_string(),
                    execution_id: env.execution_id.clone(),
                    run_id: self.run_id,
                    timestamp: now_iso(),
                    simulation_tick: tick,
                    state: "beam".to_string(),
                    substate: "not_ready".to_string(),
                    target_worker_count: Some(self.params.target_worker_count),
                    slices_per_sample: Some(self.params.slices_per_sample),
                    stf_rate: Some(self.params.stf_rate),
                })
                .await;
                self.phase = Phase::AfterImminent;
                Ok(Step::Wait(BROADCAST_TICK))
            }
            Phase::AfterImminent => {
                self.phase = Phase::Rampup;
                Ok(Step::Wait(self.params.broadcast_delay))
            }
            Phase::Rampup => {
                self.phase = Phase::StartRunBroadcast;
                Ok(Step::Wait(self.params.run_imminent_delay))
            }
            Phase::StartRunBroadcast => {
                env.broadcast(&Message::start_run(
                    &self.namespace,
                    &env.execution_id,
                    self.run_id,
                    tick,
                ))
                .await;
                self.phase = Phase::AfterStartRun;
                Ok(Step::Wait(BROADCAST_TICK))
            }
            Phase::AfterStartRun => {
                self.phase = Phase::SampleNext;
                Ok(Step::Wait(self.params.broadcast_delay))
            }
            Phase::SampleNext => {
                if self.sample_count == 0 {
                    self.run_started_at = tick;
                }
                if (tick - self.run_started_at) < self.params.run_duration {
                    self.phase = Phase::SampleBroadcast;
                } else {
                    self.phase = Phase::EndBroadcast;
                }
                Ok(Step::Wait(0.0))
            }
            Phase::SampleBroadcast => {
                self.sample_count += 1;
                let tf_filename = format!("tf.{}.{:06}.sample", self.run_id, self.sample_count);
                let slices: Vec<serde_json::Value> = (0..self.params.slices_per_sample)
                    .map(|i| {
                        self.slice_count += 1;
                        serde_json::json!({
                            "slice_id": i + 1,
                            "tf_filename": tf_filename,
                        })
                    })
                    .collect();
                env.broadcast(&Message::DataReady {
                    namespace: self.namespace.as_str().to_string(),
                    execution_id: env.execution_id.clone(),
                    run_id: self.run_id,
                    tf_filename,
                    slices,
                    timestamp: now_iso(),
                    simulation_tick: tick,
                })
                .await;
                self.phase = Phase::SampleSpacing;
                Ok(Step::Wait(BROADCAST_TICK))
            }
            Phase::SampleSpacing => {
                self.phase = Phase::SampleNext;
                let remaining = self.params.run_duration - (tick - self.run_started_at);
                Ok(Step::Wait(self.sample_interval().min(remaining).max(0.0)))
            }
            Phase::EndBroadcast => {
                env.broadcast(&Message::EndRun {
                    namespace: self.namespace.as_str().to_string(),
                    execution_id: env.execution_id.clone(),
                    run_id: self.run_id,
                    timestamp: now_iso(),
                    simulation_tick: tick,
                    total_stf_files: None,
                    total_tf_files_received: Some(self.sample_count),
                    total_slices_created: Some(self.slice_count),
                })
                .await;
                self.phase = Phase::AfterEnd;
                Ok(Step::Wait(BROADCAST_TICK))
            }
            Phase::AfterEnd => {
                self.phase = Phase::Rampdown;
                Ok(Step::Wait(self.params.broadcast_delay))
            }
            Phase::Rampdown => {
                self.phase = Phase::Finished;
                Ok(Step::Wait(self.params.worker_rampdown_time))
            }
            Phase::Finished => Ok(Step::Done),
        }
    }
}

#[cfg(test)]
#[path = "fast_processing_tests.rs"]
mod tests;
