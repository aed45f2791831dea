//! Store trait definitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::workflow::{
    ExecutionError, ExecutionEvent, ExecutionMetrics, ExecutionResult, ExecutionStatus,
    StepExecution, WorkflowDefinition, WorkflowExecution, WorkflowPatch,
};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Workflow definition not found
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    /// Execution record not found
    #[error("execution not found: {0}")]
    ExecutionNotFound(Uuid),

    /// Step record index outside the execution's step history
    #[error("execution {execution_id} has no step record at index {index}")]
    StepIndexOutOfRange { execution_id: Uuid, index: usize },

    /// Backend failure
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Filter for listing workflow definitions
///
/// Provided fields are AND-combined; the tags filter is satisfied if the
/// workflow has any overlapping tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl WorkflowFilter {
    /// Whether a definition passes all provided criteria
    pub fn matches(&self, definition: &WorkflowDefinition) -> bool {
        if let Some(author) = &self.author {
            if definition.author.as_deref() != Some(author.as_str()) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if definition.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            if !tags.iter().any(|t| definition.tags.contains(t)) {
                return false;
            }
        }
        true
    }
}

/// Filter for listing executions
///
/// Criteria are AND-combined; `limit` truncates the matched set, then
/// `offset` skips from the front of the truncated set, in that order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_after: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_before: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
}

impl ExecutionFilter {
    /// Whether a record passes the criteria (ignores `limit`/`offset`)
    pub fn matches(&self, execution: &WorkflowExecution) -> bool {
        if let Some(workflow_id) = &self.workflow_id {
            if &execution.workflow_id != workflow_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if execution.status != status {
                return false;
            }
        }
        if let Some(after) = self.started_after {
            if execution.started_at <= after {
                return false;
            }
        }
        if let Some(before) = self.started_before {
            if execution.started_at >= before {
                return false;
            }
        }
        true
    }

    /// Filter for running executions of one workflow
    pub fn running(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: Some(workflow_id.into()),
            status: Some(ExecutionStatus::Running),
            ..Default::default()
        }
    }
}

/// Store for workflow definitions
///
/// Implementations must be thread-safe; every mutation is scoped to one keyed
/// definition.
#[async_trait]
pub trait WorkflowStore: Send + Sync + 'static {
    /// Insert or overwrite a definition under its id
    ///
    /// Duplicate ids overwrite (last write wins); the engine validates before
    /// calling this.
    async fn put(&self, definition: WorkflowDefinition) -> Result<(), StoreError>;

    /// Fetch a definition; a read miss is not an error
    async fn get(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>, StoreError>;

    /// Linear scan with AND-combined filters
    async fn list(&self, filter: &WorkflowFilter) -> Result<Vec<WorkflowDefinition>, StoreError>;

    /// Merge a partial update into an existing definition, preserving its id
    async fn update(
        &self,
        workflow_id: &str,
        patch: WorkflowPatch,
    ) -> Result<WorkflowDefinition, StoreError>;

    /// Remove a definition
    ///
    /// The engine enforces the running-executions guard before calling this.
    async fn delete(&self, workflow_id: &str) -> Result<(), StoreError>;

    /// Number of stored definitions
    async fn count(&self) -> Result<usize, StoreError>;
}

/// Store for execution records
///
/// The runner and step executor mutate records through these narrow,
/// per-field operations so external status flips (pause, cancel) interleave
/// at single-write granularity. Every write stamps the record's `updated_at`.
#[async_trait]
pub trait ExecutionStore: Send + Sync + 'static {
    /// Insert a freshly allocated record
    async fn create(&self, execution: WorkflowExecution) -> Result<(), StoreError>;

    /// Fetch a record; a read miss is not an error
    async fn get(&self, execution_id: Uuid) -> Result<Option<WorkflowExecution>, StoreError>;

    /// Linear scan with AND-combined filters, then limit, then offset
    async fn list(&self, filter: &ExecutionFilter) -> Result<Vec<WorkflowExecution>, StoreError>;

    /// Write the status field
    async fn set_status(
        &self,
        execution_id: Uuid,
        status: ExecutionStatus,
    ) -> Result<(), StoreError>;

    /// Terminal transition: status plus `completed_at`, `duration_ms`, and
    /// the optional error/result payloads
    async fn finish(
        &self,
        execution_id: Uuid,
        status: ExecutionStatus,
        error: Option<ExecutionError>,
        result: Option<ExecutionResult>,
    ) -> Result<(), StoreError>;

    /// Write the current step pointer
    async fn set_current_step(
        &self,
        execution_id: Uuid,
        step_id: Option<String>,
    ) -> Result<(), StoreError>;

    /// Append a step record, returning its index in the step history
    async fn append_step(
        &self,
        execution_id: Uuid,
        step: StepExecution,
    ) -> Result<usize, StoreError>;

    /// Replace the step record at `index`
    async fn update_step(
        &self,
        execution_id: Uuid,
        index: usize,
        step: StepExecution,
    ) -> Result<(), StoreError>;

    /// Append to the execution's audit log
    async fn append_event(
        &self,
        execution_id: Uuid,
        event: ExecutionEvent,
    ) -> Result<(), StoreError>;

    /// Write one context key
    async fn set_context_value(
        &self,
        execution_id: Uuid,
        key: String,
        value: Value,
    ) -> Result<(), StoreError>;

    /// Write the metrics counters
    async fn set_metrics(
        &self,
        execution_id: Uuid,
        metrics: ExecutionMetrics,
    ) -> Result<(), StoreError>;

    /// Stamp `updated_at` without other changes
    async fn touch(&self, execution_id: Uuid) -> Result<(), StoreError>;

    /// Number of running executions for a workflow (delete guard)
    async fn count_running(&self, workflow_id: &str) -> Result<usize, StoreError>;

    /// Total number of stored records
    async fn count(&self) -> Result<usize, StoreError>;
}
