//! In-memory store implementations
//!
//! Reference backends: all data lives in process memory behind a `RwLock`.
//! Suitable for embedding and tests; a persistent backend implements the same
//! traits with identical semantics.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use super::traits::*;
use crate::workflow::{
    ExecutionError, ExecutionEvent, ExecutionMetrics, ExecutionResult, ExecutionStatus,
    StepExecution, WorkflowDefinition, WorkflowExecution, WorkflowPatch,
};

/// In-memory workflow definition store
pub struct InMemoryWorkflowStore {
    workflows: RwLock<HashMap<String, WorkflowDefinition>>,
}

impl InMemoryWorkflowStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            workflows: RwLock::new(HashMap::new()),
        }
    }

    /// Clear all definitions (for testing)
    pub fn clear(&self) {
        self.workflows.write().clear();
    }
}

impl Default for InMemoryWorkflowStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn put(&self, definition: WorkflowDefinition) -> Result<(), StoreError> {
        self.workflows
            .write()
            .insert(definition.id.clone(), definition);
        Ok(())
    }

    async fn get(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>, StoreError> {
        Ok(self.workflows.read().get(workflow_id).cloned())
    }

    async fn list(&self, filter: &WorkflowFilter) -> Result<Vec<WorkflowDefinition>, StoreError> {
        let mut matched: Vec<_> = self
            .workflows
            .read()
            .values()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matched)
    }

    async fn update(
        &self,
        workflow_id: &str,
        patch: WorkflowPatch,
    ) -> Result<WorkflowDefinition, StoreError> {
        let mut workflows = self.workflows.write();
        let definition = workflows
            .get_mut(workflow_id)
            .ok_or_else(|| StoreError::WorkflowNotFound(workflow_id.to_string()))?;

        definition.apply(patch);
        Ok(definition.clone())
    }

    async fn delete(&self, workflow_id: &str) -> Result<(), StoreError> {
        self.workflows
            .write()
            .remove(workflow_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::WorkflowNotFound(workflow_id.to_string()))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.workflows.read().len())
    }
}

/// In-memory execution record store
pub struct InMemoryExecutionStore {
    executions: RwLock<HashMap<Uuid, WorkflowExecution>>,
}

impl InMemoryExecutionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            executions: RwLock::new(HashMap::new()),
        }
    }

    /// Clear all records (for testing)
    pub fn clear(&self) {
        self.executions.write().clear();
    }

    fn mutate<T>(
        &self,
        execution_id: Uuid,
        f: impl FnOnce(&mut WorkflowExecution) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut executions = self.executions.write();
        let execution = executions
            .get_mut(&execution_id)
            .ok_or(StoreError::ExecutionNotFound(execution_id))?;

        let value = f(execution)?;
        execution.updated_at = Utc::now();
        Ok(value)
    }
}

impl Default for InMemoryExecutionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn create(&self, execution: WorkflowExecution) -> Result<(), StoreError> {
        self.executions.write().insert(execution.id, execution);
        Ok(())
    }

    async fn get(&self, execution_id: Uuid) -> Result<Option<WorkflowExecution>, StoreError> {
        Ok(self.executions.read().get(&execution_id).cloned())
    }

    async fn list(&self, filter: &ExecutionFilter) -> Result<Vec<WorkflowExecution>, StoreError> {
        let mut matched: Vec<_> = self
            .executions
            .read()
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matched.sort_by_key(|e| e.started_at);

        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        if let Some(offset) = filter.offset {
            matched = matched.into_iter().skip(offset).collect();
        }

        Ok(matched)
    }

    async fn set_status(
        &self,
        execution_id: Uuid,
        status: ExecutionStatus,
    ) -> Result<(), StoreError> {
        self.mutate(execution_id, |execution| {
            execution.status = status;
            Ok(())
        })
    }

    async fn finish(
        &self,
        execution_id: Uuid,
        status: ExecutionStatus,
        error: Option<ExecutionError>,
        result: Option<ExecutionResult>,
    ) -> Result<(), StoreError> {
        self.mutate(execution_id, |execution| {
            let now = Utc::now();
            execution.status = status;
            execution.completed_at = Some(now);
            execution.duration_ms = Some((now - execution.started_at).num_milliseconds());
            if error.is_some() {
                execution.error = error;
            }
            if result.is_some() {
                execution.result = result;
            }
            Ok(())
        })
    }

    async fn set_current_step(
        &self,
        execution_id: Uuid,
        step_id: Option<String>,
    ) -> Result<(), StoreError> {
        self.mutate(execution_id, |execution| {
            execution.current_step_id = step_id;
            Ok(())
        })
    }

    async fn append_step(
        &self,
        execution_id: Uuid,
        step: StepExecution,
    ) -> Result<usize, StoreError> {
        self.mutate(execution_id, |execution| {
            execution.step_executions.push(step);
            Ok(execution.step_executions.len() - 1)
        })
    }

    async fn update_step(
        &self,
        execution_id: Uuid,
        index: usize,
        step: StepExecution,
    ) -> Result<(), StoreError> {
        self.mutate(execution_id, |execution| {
            let slot = execution.step_executions.get_mut(index).ok_or(
                StoreError::StepIndexOutOfRange {
                    execution_id,
                    index,
                },
            )?;
            *slot = step;
            Ok(())
        })
    }

    async fn append_event(
        &self,
        execution_id: Uuid,
        event: ExecutionEvent,
    ) -> Result<(), StoreError> {
        self.mutate(execution_id, |execution| {
            execution.events.push(event);
            Ok(())
        })
    }

    async fn set_context_value(
        &self,
        execution_id: Uuid,
        key: String,
        value: Value,
    ) -> Result<(), StoreError> {
        self.mutate(execution_id, |execution| {
            execution.context.insert(key, value);
            Ok(())
        })
    }

    async fn set_metrics(
        &self,
        execution_id: Uuid,
        metrics: ExecutionMetrics,
    ) -> Result<(), StoreError> {
        self.mutate(execution_id, |execution| {
            execution.metrics = metrics;
            Ok(())
        })
    }

    async fn touch(&self, execution_id: Uuid) -> Result<(), StoreError> {
        self.mutate(execution_id, |_| Ok(()))
    }

    async fn count_running(&self, workflow_id: &str) -> Result<usize, StoreError> {
        Ok(self
            .executions
            .read()
            .values()
            .filter(|e| e.workflow_id == workflow_id && e.status == ExecutionStatus::Running)
            .count())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.executions.read().len())
    }
}
