// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workflow runner agent.
//!
//! Listens on `/queue/workflow_control`. `run_workflow` starts one
//! background task owning the simulation; the agent refuses a second
//! workflow while `PROCESSING`. `stop_workflow` sets the cooperative stop
//! flag; `status_request` reports current state.

use crate::driver::{drive, RunOutcome};
use crate::error::WorkflowError;
use crate::executor::{create_executor, WorkflowEnv};
use crate::lifecycle::{
    allocate_execution_id, create_execution_record, finish_execution, outcome_status,
    register_definition,
};
use crate::sim::{SimClock, SimMode};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use swf_agent::{AgentCore, AgentError, MessageHandler};
use swf_broker::Publisher;
use swf_config::{
    apply_param_overrides, apply_testbed_overrides, expanded_parameter_values,
    load_workflow_config, testbed_namespace, WorkflowSection,
};
use swf_core::{ExecutionStatus, Message, Namespace, OperationalState};
use swf_monitor::MonitorApi;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

struct ActiveWorkflow {
    workflow_name: String,
    execution_id: Arc<Mutex<Option<String>>>,
    stop: CancellationToken,
}

struct LaunchSpec {
    workflow_name: String,
    config_name: Option<String>,
    realtime: bool,
    duration: f64,
    params: serde_json::Map<String, serde_json::Value>,
}

pub struct WorkflowRunnerAgent<M: MonitorApi + 'static> {
    core: Arc<AgentCore<M>>,
    publisher: Arc<dyn Publisher>,
    monitor: Arc<dyn MonitorApi>,
    workflows_dir: PathBuf,
    testbed_overrides: toml::Table,
    executed_by: String,
    active: Arc<Mutex<Option<ActiveWorkflow>>>,
}

impl<M: MonitorApi + 'static> WorkflowRunnerAgent<M> {
    pub fn new(
        core: Arc<AgentCore<M>>,
        publisher: Arc<dyn Publisher>,
        monitor: Arc<dyn MonitorApi>,
        workflows_dir: impl Into<PathBuf>,
        testbed_overrides: toml::Table,
        executed_by: String,
    ) -> Self {
        Self {
            core,
            publisher,
            monitor,
            workflows_dir: workflows_dir.into(),
            testbed_overrides,
            executed_by,
            active: Arc::new(Mutex::new(None)),
        }
    }

    async fn handle_run_workflow(&self, spec: LaunchSpec) {
        if self.core.state() == OperationalState::Processing {
            let running = self
                .active
                .lock()
                .as_ref()
                .map(|a| a.workflow_name.clone())
                .unwrap_or_default();
            warn!(
                requested = %spec.workflow_name,
                running = %running,
                "cannot start workflow, one is already running"
            );
            return;
        }

        let stop = CancellationToken::new();
        let execution_id = Arc::new(Mutex::new(None));
        *self.active.lock() = Some(ActiveWorkflow {
            workflow_name: spec.workflow_name.clone(),
            execution_id: Arc::clone(&execution_id),
            stop: stop.clone(),
        });
        self.core.set_processing().await;
        info!(
            workflow_name = %spec.workflow_name,
            config = spec.config_name.as_deref().unwrap_or("default"),
            realtime = spec.realtime,
            "starting workflow"
        );

        let core = Arc::clone(&self.core);
        let monitor = Arc::clone(&self.monitor);
        let publisher = Arc::clone(&self.publisher);
        let namespace = core.namespace().clone();
        let workflows_dir = self.workflows_dir.clone();
        let overrides = self.testbed_overrides.clone();
        let executed_by = self.executed_by.clone();
        let active = Arc::clone(&self.active);

        tokio::spawn(async move {
            let workflow_name = spec.workflow_name.clone();
            let result = execute_workflow(
                &monitor,
                &publisher,
                &namespace,
                &workflows_dir,
                &overrides,
                &executed_by,
                spec,
                stop,
                Arc::clone(&execution_id),
            )
            .await;

            match result {
                Ok((execution_id, outcome)) => {
                    let status = outcome_status(outcome);
                    finish_execution(&monitor, &execution_id, status).await;
                    info!(%workflow_name, %execution_id, status = ?status, "workflow finished");
                }
                Err(e) => {
                    let known_id = execution_id.lock().clone();
                    error!(
                        %workflow_name,
                        execution_id = known_id.as_deref().unwrap_or("unknown"),
                        error = %e,
                        "workflow failed"
                    );
                    if let Some(id) = known_id {
                        finish_execution(&monitor, &id, ExecutionStatus::Failed).await;
                    }
                }
            }

            active.lock().take();
            core.set_ready().await;
        });
    }

    fn handle_stop_workflow(&self, requested_execution_id: Option<&str>) {
        let active = self.active.lock();
        let Some(active) = active.as_ref() else {
            info!("no workflow running to stop");
            return;
        };
        let current_id = active.execution_id.lock().clone();
        if let (Some(requested), Some(current)) = (requested_execution_id, current_id.as_deref()) {
            if requested != current {
                info!(
                    requested,
                    current, "stop request for another execution, ignoring"
                );
                return;
            }
        }
        info!(
            workflow_name = %active.workflow_name,
            execution_id = current_id.as_deref().unwrap_or("allocating"),
            "stopping workflow"
        );
        active.stop.cancel();
    }

    fn handle_status_request(&self) {
        let active = self.active.lock();
        let (workflow, execution) = active
            .as_ref()
            .map(|a| (a.workflow_name.clone(), a.execution_id.lock().clone()))
            .unwrap_or_default();
        info!(
            state = %self.core.state(),
            workflow = workflow.as_str(),
            execution = execution.as_deref().unwrap_or(""),
            "status"
        );
    }
}

#[async_trait]
impl<M: MonitorApi + 'static> MessageHandler for WorkflowRunnerAgent<M> {
    async fn handle(&mut self, message: Message) -> Result<(), AgentError> {
        match message {
            Message::RunWorkflow {
                workflow_name,
                config,
                realtime,
                duration,
                params,
                ..
            } => {
                self.handle_run_workflow(LaunchSpec {
                    workflow_name,
                    config_name: config,
                    realtime,
                    duration,
                    params,
                })
                .await;
            }
            Message::StopWorkflow { execution_id, .. } => {
                self.handle_stop_workflow(execution_id.as_deref());
            }
            Message::StatusRequest { .. } => self.handle_status_request(),
            other => debug!(msg_type = other.msg_type(), "ignoring unhandled message type"),
        }
        Ok(())
    }
}

/// The full launch sequence: layered config, execution id, definition,
/// execution record, then the stepping loop.
#[allow(clippy::too_many_arguments)]
async fn execute_workflow(
    monitor: &Arc<dyn MonitorApi>,
    publisher: &Arc<dyn Publisher>,
    agent_namespace: &Namespace,
    workflows_dir: &Path,
    testbed_overrides: &toml::Table,
    executed_by: &str,
    spec: LaunchSpec,
    stop: CancellationToken,
    execution_slot: Arc<Mutex<Option<String>>>,
) -> Result<(String, RunOutcome), WorkflowError> {
    let mut config =
        load_workflow_config(workflows_dir, &spec.workflow_name, spec.config_name.as_deref())?;
    apply_testbed_overrides(&mut config, testbed_overrides);
    apply_param_overrides(&mut config, &spec.params);
    let workflow = WorkflowSection::from_config(&config)?;

    let mut executor = create_executor(&spec.workflow_name, &config)?;

    let execution_id = allocate_execution_id(monitor, &spec.workflow_name, executed_by).await?;
    *execution_slot.lock() = Some(execution_id.clone());

    let definition = register_definition(
        monitor,
        &workflow.name,
        &workflow.version,
        executor.definition(),
        expanded_parameter_values(&config),
        executed_by,
    )
    .await?;

    let namespace = testbed_namespace(&config);
    create_execution_record(
        monitor,
        &execution_id,
        definition.id,
        namespace.as_deref(),
        serde_json::to_value(&config).unwrap_or_default(),
        executed_by,
    )
    .await?;

    let mode = if spec.realtime {
        SimMode::Realtime
    } else {
        SimMode::Fast
    };
    let mut env = WorkflowEnv {
        publisher: Arc::clone(publisher),
        monitor: Arc::clone(monitor),
        namespace: namespace
            .map(Namespace::new)
            .unwrap_or_else(|| agent_namespace.clone()),
        execution_id: execution_id.clone(),
        clock: SimClock::new(mode),
    };
    let outcome = drive(executor.as_mut(), &mut env, &stop, spec.duration).await?;
    Ok((execution_id, outcome))
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
