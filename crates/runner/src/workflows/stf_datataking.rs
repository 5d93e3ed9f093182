// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The DAQ data-taking state machine.
//!
//! Sequence: no_beam/not_ready → beam/not_ready (run_imminent) → beam/ready
//! → physics periods (start_run, then resume_run after each standby) →
//! beam/not_ready (end_run) → no_beam/not_ready. STF generation inside a
//! period is count-based when `stf_count` is set, duration-based otherwise.

use crate::error::WorkflowError;
use crate::executor::{Step, WorkflowEnv, WorkflowExecutor};
use crate::lifecycle::initial_run_state;
use async_trait::async_trait;
use swf_config::{
    merged_params, params_view, testbed_namespace, DaqParams, FastProcessingParams,
};
use swf_core::{stf_filename, Message, Namespace};
use tracing::{info, warn};

const DEFINITION: &str = "\
stf_datataking: DAQ data-taking state machine.
States: no_beam/not_ready -> beam/not_ready (run_imminent) -> beam/ready
-> [run/physics (start_run|resume_run), stf_gen xN, run/standby (pause_run)]*
-> beam/not_ready (end_run) -> no_beam/not_ready.
STF generation per physics period: stf_count files at stf_interval spacing,
or continuous emission for physics_period_duration seconds.
physics_period_count = 0 runs periods until stopped.";

/// Simulated time a broadcast occupies.
const BROADCAST_TICK: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    BroadcastImminent,
    AfterImminent,
    BeamNotReady,
    BeamReady,
    PeriodBroadcast,
    PeriodDelay,
    StfNext,
    StfBroadcast,
    StfGeneration,
    StfSpacing,
    PeriodEnd,
    PauseBroadcast,
    PauseDelay,
    Standby,
    EndBroadcast,
    EndDelay,
    BeamNotReadyEnd,
    Finished,
}

pub struct DaqExecutor {
    daq: DaqParams,
    fast_processing: FastProcessingParams,
    namespace: Namespace,
    phase: Phase,
    run_id: u64,
    stf_sequence: u64,
    period: u32,
    emitted_in_period: u64,
    period_started_at: f64,
}

impl DaqExecutor {
    /// Build from the layered config. Parameters merge across all
    /// non-system sections over the `[daq_state_machine]` base, so overrides
    /// apply regardless of which section carries them.
    pub fn from_config(config: &toml::Table) -> Result<Self, WorkflowError> {
        let merged = merged_params(config);
        let daq: DaqParams = params_view(&merged)?;
        let fast_processing: FastProcessingParams = params_view(&merged)?;
        let namespace = Namespace::new(testbed_namespace(config).unwrap_or_default());
        Ok(Self {
            daq,
            fast_processing,
            namespace,
            phase: Phase::Start,
            run_id: 0,
            stf_sequence: 0,
            period: 0,
            emitted_in_period: 0,
            period_started_at: 0.0,
        })
    }

    fn period_has_more_stfs(&self, now: f64) -> bool {
        match self.daq.stf_count {
            Some(count) => self.emitted_in_period < count,
            None => (now - self.period_started_at) < self.daq.physics_period_duration,
        }
    }

    fn more_periods(&self) -> bool {
        self.daq.physics_period_count == 0 || self.period < self.daq.physics_period_count
    }
}

#[async_trait]
impl WorkflowExecutor for DaqExecutor {
    fn definition(&self) -> &'static str {
        DEFINITION
    }

    async fn step(&mut self, env: &mut WorkflowEnv) -> Result<Step, WorkflowError> {
        let tick = env.tick();
        match self.phase {
            Phase::Start => {
                // Run id is allocated at the first step, and the run-state
                // row exists before the run becomes imminent.
                self.run_id = env.monitor.next_run_number().await?;
                let state = initial_run_state(self.run_id, &env.execution_id, &self.fast_processing);
                match env.monitor.create_run_state(&state).await {
                    Ok(()) => info!(run_id = self.run_id, "run state initialized"),
                    Err(e) => warn!(run_id = self.run_id, error = %e, "run state init failed"),
                }
                self.phase = Phase::BroadcastImminent;
                Ok(Step::Wait(self.daq.no_beam_not_ready_delay))
            }
            Phase::BroadcastImminent => {
                env.broadcast(&Message::run_imminent(
                    &self.namespace,
                    &env.execution_id,
                    self.run_id,
                    tick,
                ))
                .await;
                self.phase = Phase::AfterImminent;
                Ok(Step::Wait(BROADCAST_TICK))
            }
            Phase::AfterImminent => {
                self.phase = Phase::BeamNotReady;
                Ok(Step::Wait(self.daq.broadcast_delay))
            }
            Phase::BeamNotReady => {
                self.phase = Phase::BeamReady;
                Ok(Step::Wait(self.daq.beam_not_ready_delay))
            }
            Phase::BeamReady => {
                self.phase = Phase::PeriodBroadcast;
                Ok(Step::Wait(self.daq.beam_ready_delay))
            }
            Phase::PeriodBroadcast => {
                let message = if self.period == 0 {
                    Message::start_run(&self.namespace, &env.execution_id, self.run_id, tick)
                } else {
                    Message::resume_run(&self.namespace, &env.execution_id, self.run_id, tick)
                };
                env.broadcast(&message).await;
                self.phase = Phase::PeriodDelay;
                Ok(Step::Wait(BROADCAST_TICK))
            }
            Phase::PeriodDelay => {
                self.phase = Phase::StfNext;
                Ok(Step::Wait(self.daq.broadcast_delay))
            }
            Phase::StfNext => {
                if self.emitted_in_period == 0 {
                    self.period_started_at = tick;
                }
                if self.period_has_more_stfs(tick) {
                    self.phase = Phase::StfBroadcast;
                } else {
                    self.phase = Phase::PeriodEnd;
                }
                Ok(Step::Wait(0.0))
            }
            Phase::StfBroadcast => {
                self.stf_sequence += 1;
                self.emitted_in_period += 1;
                let filename = stf_filename(self.run_id, self.stf_sequence);
                env.broadcast(&Message::stf_gen(
                    &self.namespace,
                    &env.execution_id,
                    self.run_id,
                    tick,
                    filename,
                    self.stf_sequence,
                ))
                .await;
                self.phase = Phase::StfGeneration;
                Ok(Step::Wait(BROADCAST_TICK))
            }
            Phase::StfGeneration => {
                self.phase = Phase::StfSpacing;
                Ok(Step::Wait(self.daq.stf_generation_time))
            }
            Phase::StfSpacing => {
                self.phase = Phase::StfNext;
                if self.period_has_more_stfs(tick) {
                    Ok(Step::Wait(self.daq.stf_interval))
                } else {
                    Ok(Step::Wait(0.0))
                }
            }
            Phase::PeriodEnd => {
                self.period += 1;
                self.emitted_in_period = 0;
                if self.more_periods() {
                    self.phase = Phase::PauseBroadcast;
                } else {
                    self.phase = Phase::EndBroadcast;
                }
                Ok(Step::Wait(0.0))
            }
            Phase::PauseBroadcast => {
                env.broadcast(&Message::pause_run(
                    &self.namespace,
                    &env.execution_id,
                    self.run_id,
                    tick,
                    "Brief standby period",
                ))
                .await;
                self.phase = Phase::PauseDelay;
                Ok(Step::Wait(BROADCAST_TICK))
            }
            Phase::PauseDelay => {
                self.phase = Phase::Standby;
                Ok(Step::Wait(self.daq.broadcast_delay))
            }
            Phase::Standby => {
                self.phase = Phase::PeriodBroadcast;
                Ok(Step::Wait(self.daq.standby_duration))
            }
            Phase::EndBroadcast => {
                env.broadcast(&Message::end_run_daq(
                    &self.namespace,
                    &env.execution_id,
                    self.run_id,
                    tick,
                    self.stf_sequence,
                ))
                .await;
                self.phase = Phase::EndDelay;
                Ok(Step::Wait(BROADCAST_TICK))
            }
            Phase::EndDelay => {
                self.phase = Phase::BeamNotReadyEnd;
                Ok(Step::Wait(self.daq.broadcast_delay))
            }
            Phase::BeamNotReadyEnd => {
                self.phase = Phase::Finished;
                Ok(Step::Wait(self.daq.beam_not_ready_end_delay))
            }
            Phase::Finished => Ok(Step::Done),
        }
    }
}

#[cfg(test)]
#[path = "stf_datataking_tests.rs"]
mod tests;
