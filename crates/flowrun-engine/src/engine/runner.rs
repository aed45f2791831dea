//! Workflow runner
//!
//! Drives one execution through its workflow's steps in definition order,
//! one at a time. The loop re-reads the execution's status from the store at
//! each step boundary: pause and cancel are cooperative signals observed
//! between steps, never mid-step.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::agent::AgentRegistry;
use crate::bus::{EngineEvent, EngineEventType, EventBus};
use crate::error::EngineError;
use crate::store::ExecutionStore;
use crate::workflow::{
    ExecutionError, ExecutionEvent, ExecutionMetrics, ExecutionResult, ExecutionStatus,
    ResultMetadata, WorkflowDefinition, WorkflowExecution,
};

use super::step::{StepExecutor, StepOutcome};

/// Drives executions step by step on behalf of the engine
#[derive(Clone)]
pub(crate) struct WorkflowRunner {
    executions: Arc<dyn ExecutionStore>,
    bus: Arc<dyn EventBus>,
    steps: StepExecutor,
}

impl WorkflowRunner {
    pub(crate) fn new(
        executions: Arc<dyn ExecutionStore>,
        agents: Arc<AgentRegistry>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        let steps = StepExecutor::new(executions.clone(), agents, bus.clone());
        Self {
            executions,
            bus,
            steps,
        }
    }

    /// Run the step loop from `start_index` to the end of the workflow
    ///
    /// Step failures are converted into the execution's terminal state here;
    /// an `Err` from this method means an infrastructure fault (store or bus)
    /// and is handled by the supervisor.
    pub(crate) async fn run(
        &self,
        workflow: WorkflowDefinition,
        execution_id: Uuid,
        start_index: usize,
    ) -> Result<(), EngineError> {
        let mut interrupted = false;

        for step in workflow.steps.iter().skip(start_index) {
            let Some(execution) = self.executions.get(execution_id).await? else {
                warn!(%execution_id, "execution record vanished, stopping runner");
                return Ok(());
            };

            if execution.status != ExecutionStatus::Running {
                debug!(
                    %execution_id,
                    status = %execution.status,
                    "execution no longer running, leaving step loop"
                );
                interrupted = true;
                break;
            }

            self.executions
                .set_current_step(execution_id, Some(step.id.clone()))
                .await?;

            let outcome = self
                .steps
                .execute(&workflow.id, execution_id, step)
                .await?;

            self.refresh_metrics(execution_id).await?;

            if let StepOutcome::Aborted { message } = outcome {
                self.finalize_failed(execution_id, &workflow.id, message)
                    .await?;
                self.executions.touch(execution_id).await?;
                return Ok(());
            }
        }

        if !interrupted {
            self.finalize_completed(execution_id, &workflow.id).await?;
        }
        self.executions.touch(execution_id).await?;

        Ok(())
    }

    /// Recompute step counters as counts over the records so far
    async fn refresh_metrics(&self, execution_id: Uuid) -> Result<(), EngineError> {
        if let Some(execution) = self.executions.get(execution_id).await? {
            let (completed, failed) = execution.step_counts();
            self.executions
                .set_metrics(
                    execution_id,
                    ExecutionMetrics {
                        total_steps: execution.metrics.total_steps,
                        completed_steps: completed,
                        failed_steps: failed,
                    },
                )
                .await?;
        }
        Ok(())
    }

    async fn finalize_completed(
        &self,
        execution_id: Uuid,
        workflow_id: &str,
    ) -> Result<(), EngineError> {
        let Some(execution) = self.executions.get(execution_id).await? else {
            return Ok(());
        };

        let metadata = metadata_for(&execution);
        let result = ExecutionResult {
            success: true,
            outputs: execution.outputs(),
            error: None,
            metadata,
        };

        self.executions
            .finish(execution_id, ExecutionStatus::Completed, None, Some(result))
            .await?;
        self.executions
            .append_event(
                execution_id,
                ExecutionEvent::completed(Some(serde_json::to_value(metadata).unwrap_or_default())),
            )
            .await?;
        self.bus
            .emit(
                EngineEvent::new(EngineEventType::WorkflowCompleted)
                    .workflow(workflow_id)
                    .execution(execution_id),
            )
            .await?;

        info!(%execution_id, workflow_id, "execution completed");
        Ok(())
    }

    async fn finalize_failed(
        &self,
        execution_id: Uuid,
        workflow_id: &str,
        message: String,
    ) -> Result<(), EngineError> {
        let Some(execution) = self.executions.get(execution_id).await? else {
            return Ok(());
        };

        let metadata = metadata_for(&execution);
        let result = ExecutionResult {
            success: false,
            outputs: execution.outputs(),
            error: Some(message.clone()),
            metadata,
        };
        let error = ExecutionError::execution_failed(&message);

        self.executions
            .finish(
                execution_id,
                ExecutionStatus::Failed,
                Some(error),
                Some(result),
            )
            .await?;
        self.executions
            .append_event(execution_id, ExecutionEvent::failed(&message))
            .await?;
        self.bus
            .emit(
                EngineEvent::new(EngineEventType::WorkflowFailed)
                    .workflow(workflow_id)
                    .execution(execution_id),
            )
            .await?;

        error!(%execution_id, workflow_id, error = %message, "execution failed");
        Ok(())
    }

    /// Capture a runner fault into the execution record
    ///
    /// Used by the supervisor when the step loop itself errors or panics, so
    /// the failure is observed through the record rather than lost with the
    /// task. Records already in a terminal state are left untouched.
    pub(crate) async fn record_fault(&self, execution_id: Uuid, workflow_id: &str, message: String) {
        let terminal = match self.executions.get(execution_id).await {
            Ok(Some(execution)) => execution.status.is_terminal(),
            Ok(None) => return,
            Err(err) => {
                error!(%execution_id, error = %err, "could not read execution while recording fault");
                return;
            }
        };

        if terminal {
            return;
        }

        if let Err(err) = self
            .finalize_failed(execution_id, workflow_id, message)
            .await
        {
            error!(%execution_id, error = %err, "could not record runner fault");
        }
    }
}

fn metadata_for(execution: &WorkflowExecution) -> ResultMetadata {
    let (succeeded, failed) = execution.step_counts();
    ResultMetadata {
        execution_time_ms: (chrono::Utc::now() - execution.started_at).num_milliseconds(),
        steps_executed: execution.step_executions.len(),
        steps_succeeded: succeeded,
        steps_failed: failed,
    }
}
