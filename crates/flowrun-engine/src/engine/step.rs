//! Step executor
//!
//! Runs one step of one execution: builds the effective input from the step's
//! static payload and input mapping, invokes the bound agent, applies the
//! output mapping back into the execution context, and records exactly one
//! step execution per attempt.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::agent::AgentRegistry;
use crate::bus::{EngineEvent, EngineEventType, EventBus};
use crate::error::EngineError;
use crate::path;
use crate::store::ExecutionStore;
use crate::workflow::{ExecutionEvent, StepError, StepExecution, WorkflowStep};

/// How a step attempt left the execution
#[derive(Debug)]
pub(crate) enum StepOutcome {
    /// The step succeeded, or failed with `continue_on_error` set
    Continue,

    /// The step failed and the whole execution must abort
    Aborted { message: String },
}

/// Executes single steps on behalf of the runner
#[derive(Clone)]
pub(crate) struct StepExecutor {
    executions: Arc<dyn ExecutionStore>,
    agents: Arc<AgentRegistry>,
    bus: Arc<dyn EventBus>,
}

impl StepExecutor {
    pub(crate) fn new(
        executions: Arc<dyn ExecutionStore>,
        agents: Arc<AgentRegistry>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            executions,
            agents,
            bus,
        }
    }

    /// Run `step` against `execution_id`, appending one step record
    pub(crate) async fn execute(
        &self,
        workflow_id: &str,
        execution_id: Uuid,
        step: &WorkflowStep,
    ) -> Result<StepOutcome, EngineError> {
        let context = match self.executions.get(execution_id).await? {
            Some(execution) => execution.context,
            None => {
                warn!(%execution_id, step_id = %step.id, "execution record vanished before step");
                return Ok(StepOutcome::Aborted {
                    message: "execution record not found".to_string(),
                });
            }
        };

        let input = effective_input(step, &context);
        let max_attempts = step
            .retry_policy
            .as_ref()
            .map(|p| p.max_retries + 1)
            .unwrap_or(1);

        let record = StepExecution::started(&step.id, input.clone(), max_attempts);
        let index = self.executions.append_step(execution_id, record.clone()).await?;

        self.executions
            .append_event(execution_id, ExecutionEvent::step_started(&step.id, &step.agent_id))
            .await?;
        self.bus
            .emit(
                EngineEvent::new(EngineEventType::StepStarted)
                    .workflow(workflow_id)
                    .execution(execution_id)
                    .step(&step.id)
                    .agent(&step.agent_id),
            )
            .await?;

        debug!(%execution_id, step_id = %step.id, agent_id = %step.agent_id, "executing step");

        let Some(agent) = self.agents.get(&step.agent_id) else {
            let error = StepError {
                code: "AGENT_NOT_FOUND".to_string(),
                message: format!("agent not found: {}", step.agent_id),
                details: None,
            };
            return self
                .fail_step(workflow_id, execution_id, step, index, record, error)
                .await;
        };

        match agent.execute(input, &context).await {
            Ok(output) => {
                let mut completed = record;
                completed.complete(output.clone());
                self.executions
                    .update_step(execution_id, index, completed)
                    .await?;

                if let Some(mapping) = &step.output_mapping {
                    for (key, output_path) in mapping {
                        if let Some(value) = path::lookup(&output, output_path) {
                            self.executions
                                .set_context_value(execution_id, key.clone(), value.clone())
                                .await?;
                        }
                    }
                }

                self.executions
                    .append_event(
                        execution_id,
                        ExecutionEvent::step_completed(&step.id, &step.agent_id),
                    )
                    .await?;
                self.bus
                    .emit(
                        EngineEvent::new(EngineEventType::StepCompleted)
                            .workflow(workflow_id)
                            .execution(execution_id)
                            .step(&step.id)
                            .agent(&step.agent_id),
                    )
                    .await?;

                Ok(StepOutcome::Continue)
            }
            Err(agent_error) => {
                let error = StepError {
                    code: "STEP_EXECUTION_FAILED".to_string(),
                    message: agent_error.message.clone(),
                    details: Some(serde_json::json!({
                        "code": agent_error.code,
                        "retryable": agent_error.retryable,
                        "details": agent_error.details,
                    })),
                };
                self.fail_step(workflow_id, execution_id, step, index, record, error)
                    .await
            }
        }
    }

    /// Shared failure path for agent resolution and invocation errors
    async fn fail_step(
        &self,
        workflow_id: &str,
        execution_id: Uuid,
        step: &WorkflowStep,
        index: usize,
        record: StepExecution,
        error: StepError,
    ) -> Result<StepOutcome, EngineError> {
        let message = error.message.clone();

        let mut failed = record;
        failed.fail(error);
        self.executions
            .update_step(execution_id, index, failed)
            .await?;

        self.executions
            .append_event(
                execution_id,
                ExecutionEvent::step_failed(&step.id, &step.agent_id, &message),
            )
            .await?;
        self.bus
            .emit(
                EngineEvent::new(EngineEventType::StepFailed)
                    .workflow(workflow_id)
                    .execution(execution_id)
                    .step(&step.id)
                    .agent(&step.agent_id),
            )
            .await?;

        if step.continue_on_error {
            warn!(
                %execution_id,
                step_id = %step.id,
                error = %message,
                "step failed, continuing (continue_on_error)"
            );
            Ok(StepOutcome::Continue)
        } else {
            Ok(StepOutcome::Aborted {
                message: format!("step '{}' failed: {message}", step.id),
            })
        }
    }
}

/// Build a step's effective input
///
/// Starts from the static `input` and overlays each input-mapping entry with
/// the value at its context path. Missing paths are skipped. A non-object
/// static input combined with a mapping degrades to the mapped values alone.
fn effective_input(step: &WorkflowStep, context: &Map<String, Value>) -> Value {
    let Some(mapping) = &step.input_mapping else {
        return step.input.clone().unwrap_or(Value::Null);
    };

    let mut fields = match &step.input {
        Some(Value::Object(fields)) => fields.clone(),
        _ => Map::new(),
    };

    for (key, context_path) in mapping {
        if let Some(value) = path::lookup_in(context, context_path) {
            fields.insert(key.clone(), value.clone());
        }
    }

    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::WorkflowStep;
    use serde_json::json;

    fn context_from(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_effective_input_static_only() {
        let step = WorkflowStep::new("s1", "echo").with_input(json!({ "a": 1 }));
        let input = effective_input(&step, &Map::new());
        assert_eq!(input, json!({ "a": 1 }));
    }

    #[test]
    fn test_effective_input_no_input_no_mapping_is_null() {
        let step = WorkflowStep::new("s1", "echo");
        assert_eq!(effective_input(&step, &Map::new()), Value::Null);
    }

    #[test]
    fn test_effective_input_mapping_overlays_static() {
        let step = WorkflowStep::new("s1", "echo")
            .with_input(json!({ "msg": "static", "kept": true }))
            .map_input("msg", "greeting.text");

        let context = context_from(json!({ "greeting": { "text": "hello" } }));
        let input = effective_input(&step, &context);

        assert_eq!(input, json!({ "msg": "hello", "kept": true }));
    }

    #[test]
    fn test_effective_input_missing_path_is_skipped() {
        let step = WorkflowStep::new("s1", "echo")
            .with_input(json!({ "msg": "static" }))
            .map_input("user", "profile.name");

        let input = effective_input(&step, &Map::new());
        assert_eq!(input, json!({ "msg": "static" }));
    }

    #[test]
    fn test_effective_input_non_object_static_with_mapping() {
        let step = WorkflowStep::new("s1", "echo")
            .with_input(json!("scalar"))
            .map_input("msg", "text");

        let context = context_from(json!({ "text": "hi" }));
        assert_eq!(effective_input(&step, &context), json!({ "msg": "hi" }));
    }
}
