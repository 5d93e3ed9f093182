// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated HTTP session against the Monitor.
//!
//! One client per agent; concurrent users serialize through reqwest's own
//! pooling. Requests carry `Authorization: Token <token>` and a 10-second
//! timeout; heartbeat-style calls use 5 seconds.

use crate::api::MonitorApi;
use crate::error::MonitorApiError;
use crate::page::Page;
use crate::settings::MonitorSettings;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use swf_core::{
    ExecutionStatus, FastMonFile, FastMonFileRow, HeartbeatPayload, NewWorkflowDefinition,
    NewWorkflowExecution, RunState, SystemStateEvent, TfSlice, TfSliceRow, WorkflowDefinitionRow,
    WorkflowExecutionRow,
};
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct MonitorClient {
    http: reqwest::Client,
    base_url: String,
}

impl MonitorClient {
    pub fn new(settings: &MonitorSettings) -> Result<Self, MonitorApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &settings.api_token {
            let value = reqwest::header::HeaderValue::from_str(&format!("Token {token}"))
                .map_err(|e| MonitorApiError::Client(e.to_string()))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .default_headers(headers);
        if settings.is_local() {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder
            .build()
            .map_err(|e| MonitorApiError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, MonitorApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MonitorApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MonitorApiError> {
        let response = self.http.get(self.url(path)).query(query).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, MonitorApiError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn post_ignore_body(&self, path: &str, body: &Value) -> Result<(), MonitorApiError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn patch_ignore_body(&self, path: &str, body: &Value) -> Result<(), MonitorApiError> {
        let response = self.http.patch(self.url(path)).json(body).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    // -- AI memory dialogue turns --

    pub async fn list_ai_memory(&self, limit: u32) -> Result<Vec<Value>, MonitorApiError> {
        let page: Page<Value> = self
            .get_json("ai-memory/", &[("limit", limit.to_string())])
            .await?;
        Ok(page.into_vec())
    }

    pub async fn append_ai_memory(&self, turn: &Value) -> Result<(), MonitorApiError> {
        self.post_ignore_body("ai-memory/", turn).await
    }
}

#[async_trait]
impl MonitorApi for MonitorClient {
    async fn send_heartbeat(&self, payload: &HeartbeatPayload) -> Result<(), MonitorApiError> {
        let response = self
            .http
            .post(self.url("systemagents/heartbeat/"))
            .timeout(HEARTBEAT_TIMEOUT)
            .json(payload)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn post_system_event(&self, event: &SystemStateEvent) -> Result<(), MonitorApiError> {
        let body = serde_json::to_value(event).unwrap_or_default();
        self.post_ignore_body("system-state-events/", &body).await
    }

    async fn ensure_namespace(&self, namespace: &str) -> Result<(), MonitorApiError> {
        let response = self
            .http
            .post(self.url("namespaces/"))
            .json(&json!({"name": namespace}))
            .send()
            .await?;
        // Conflict means the namespace row already exists; the upsert is
        // idempotent either way.
        match response.status() {
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => {
                debug!(namespace, "namespace already present");
                Ok(())
            }
            _ => {
                Self::check(response).await?;
                Ok(())
            }
        }
    }

    async fn next_execution_sequence(&self, workflow_name: &str) -> Result<u64, MonitorApiError> {
        let body: Value = self
            .post_json(
                "state/next-workflow-execution-id/",
                &json!({"workflow_name": workflow_name}),
            )
            .await?;
        body.get("sequence")
            .and_then(Value::as_u64)
            .ok_or(MonitorApiError::MissingField("sequence"))
    }

    async fn count_executions(&self, workflow_name: &str) -> Result<u64, MonitorApiError> {
        let page: Page<Value> = self
            .get_json(
                "workflow-executions/",
                &[("workflow_name", workflow_name.to_string())],
            )
            .await?;
        Ok(page.len() as u64)
    }

    async fn find_workflow_definition(
        &self,
        workflow_name: &str,
        version: &str,
    ) -> Result<Option<WorkflowDefinitionRow>, MonitorApiError> {
        let page: Page<WorkflowDefinitionRow> = self
            .get_json(
                "workflow-definitions/",
                &[
                    ("workflow_name", workflow_name.to_string()),
                    ("version", version.to_string()),
                ],
            )
            .await?;
        Ok(page.into_vec().into_iter().next())
    }

    async fn create_workflow_definition(
        &self,
        definition: &NewWorkflowDefinition,
    ) -> Result<WorkflowDefinitionRow, MonitorApiError> {
        let body = serde_json::to_value(definition).unwrap_or_default();
        self.post_json("workflow-definitions/", &body).await
    }

    async fn create_execution(
        &self,
        execution: &NewWorkflowExecution,
    ) -> Result<(), MonitorApiError> {
        let body = serde_json::to_value(execution).unwrap_or_default();
        self.post_ignore_body("workflow-executions/", &body).await
    }

    async fn patch_execution(
        &self,
        execution_id: &str,
        status: ExecutionStatus,
        end_time: Option<String>,
    ) -> Result<(), MonitorApiError> {
        let body = json!({"status": status, "end_time": end_time});
        self.patch_ignore_body(&format!("workflow-executions/{execution_id}/"), &body)
            .await
    }

    async fn get_execution(
        &self,
        execution_id: &str,
    ) -> Result<WorkflowExecutionRow, MonitorApiError> {
        self.get_json(&format!("workflow-executions/{execution_id}/"), &[])
            .await
    }

    async fn next_run_number(&self) -> Result<u64, MonitorApiError> {
        let body: Value = self
            .post_json("state/next-run-number/", &json!({}))
            .await?;
        body.get("run_number")
            .and_then(Value::as_u64)
            .ok_or(MonitorApiError::MissingField("run_number"))
    }

    async fn create_run_state(&self, state: &RunState) -> Result<(), MonitorApiError> {
        let body = serde_json::to_value(state).unwrap_or_default();
        self.post_ignore_body("run-states/", &body).await
    }

    async fn get_run_state(&self, run_number: u64) -> Result<RunState, MonitorApiError> {
        self.get_json(&format!("run-states/{run_number}/"), &[])
            .await
    }

    async fn patch_run_state(
        &self,
        run_number: u64,
        patch: &Value,
    ) -> Result<(), MonitorApiError> {
        self.patch_ignore_body(&format!("run-states/{run_number}/"), patch)
            .await
    }

    async fn create_tf_slice(&self, slice: &TfSlice) -> Result<TfSliceRow, MonitorApiError> {
        let body = serde_json::to_value(slice).unwrap_or_default();
        self.post_json("tf-slices/", &body).await
    }

    async fn find_tf_slice(
        &self,
        run_number: u64,
        slice_id: u32,
    ) -> Result<Option<TfSliceRow>, MonitorApiError> {
        let page: Page<TfSliceRow> = self
            .get_json(
                "tf-slices/",
                &[
                    ("run_number", run_number.to_string()),
                    ("slice_id", slice_id.to_string()),
                ],
            )
            .await?;
        Ok(page.into_vec().into_iter().next())
    }

    async fn patch_tf_slice(&self, id: u64, patch: &Value) -> Result<(), MonitorApiError> {
        self.patch_ignore_body(&format!("tf-slices/{id}/"), patch)
            .await
    }

    async fn create_fastmon_file(
        &self,
        file: &FastMonFile,
    ) -> Result<FastMonFileRow, MonitorApiError> {
        let body = serde_json::to_value(file).unwrap_or_default();
        self.post_json("fastmon-files/", &body).await
    }
}
