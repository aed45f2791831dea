//! End-to-end engine tests against in-memory stores

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use flowrun_engine::prelude::*;

const WAIT: Duration = Duration::from_secs(5);

/// Returns its input unchanged
struct EchoAgent;

#[async_trait]
impl Agent for EchoAgent {
    fn id(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Returns its input unchanged."
    }

    async fn execute(
        &self,
        input: Value,
        _context: &Map<String, Value>,
    ) -> Result<Value, AgentError> {
        Ok(input)
    }
}

/// Always fails
struct FlakyAgent;

#[async_trait]
impl Agent for FlakyAgent {
    fn id(&self) -> &str {
        "flaky"
    }

    async fn execute(
        &self,
        _input: Value,
        _context: &Map<String, Value>,
    ) -> Result<Value, AgentError> {
        Err(AgentError::non_retryable("downstream unavailable"))
    }
}

/// Sleeps before answering, to hold executions in the running state
struct SlowAgent;

#[async_trait]
impl Agent for SlowAgent {
    fn id(&self) -> &str {
        "slow"
    }

    async fn execute(
        &self,
        input: Value,
        _context: &Map<String, Value>,
    ) -> Result<Value, AgentError> {
        let ms = input
            .get("sleep_ms")
            .and_then(Value::as_u64)
            .unwrap_or(150);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({ "slept_ms": ms }))
    }
}

fn engine() -> Engine {
    let engine = Engine::in_memory();
    engine.register_agent(Arc::new(EchoAgent));
    engine.register_agent(Arc::new(FlakyAgent));
    engine.register_agent(Arc::new(SlowAgent));
    engine
}

#[tokio::test]
async fn test_single_step_workflow_completes() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![WorkflowStep::new("s1", "echo").map_input("msg", "msg")],
        ))
        .await
        .unwrap();

    let execution = engine
        .start_workflow("wf1", Some(json!({ "msg": "hi" })), None)
        .await
        .unwrap();
    assert_eq!(execution.status, ExecutionStatus::Running);

    let finished = engine.wait_for_terminal(execution.id, WAIT).await.unwrap();

    assert_eq!(finished.status, ExecutionStatus::Completed);
    assert_eq!(finished.step_executions.len(), 1);
    assert_eq!(finished.step_executions[0].status, StepStatus::Completed);
    assert_eq!(
        finished.step_executions[0].output,
        Some(json!({ "msg": "hi" }))
    );

    let result = finished.result.unwrap();
    assert!(result.success);
    assert_eq!(result.metadata.steps_succeeded, 1);
    assert!(finished.completed_at.is_some());
    assert!(finished.duration_ms.is_some());
}

#[tokio::test]
async fn test_failing_step_aborts_execution() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![
                WorkflowStep::new("s1", "flaky"),
                WorkflowStep::new("s2", "echo"),
            ],
        ))
        .await
        .unwrap();

    let execution = engine.start_workflow("wf1", None, None).await.unwrap();
    let finished = engine.wait_for_terminal(execution.id, WAIT).await.unwrap();

    // Step 2 must never run after step 1 failed without continue_on_error
    assert_eq!(finished.status, ExecutionStatus::Failed);
    assert_eq!(finished.step_executions.len(), 1);
    assert_eq!(finished.step_executions[0].status, StepStatus::Failed);

    let error = finished.error.unwrap();
    assert_eq!(error.code, "WORKFLOW_EXECUTION_FAILED");
    assert!(error.message.contains("s1"));

    let result = finished.result.unwrap();
    assert!(!result.success);
    assert_eq!(result.metadata.steps_failed, 1);
}

#[tokio::test]
async fn test_continue_on_error_runs_remaining_steps() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![
                WorkflowStep::new("s1", "flaky").continue_on_error(),
                WorkflowStep::new("s2", "echo").with_input(json!({ "ok": true })),
            ],
        ))
        .await
        .unwrap();

    let execution = engine.start_workflow("wf1", None, None).await.unwrap();
    let finished = engine.wait_for_terminal(execution.id, WAIT).await.unwrap();

    assert_eq!(finished.status, ExecutionStatus::Completed);
    assert_eq!(finished.step_executions.len(), 2);
    assert_eq!(finished.step_executions[0].status, StepStatus::Failed);
    assert_eq!(finished.step_executions[1].status, StepStatus::Completed);
    assert_eq!(finished.metrics.completed_steps, 1);
    assert_eq!(finished.metrics.failed_steps, 1);
}

#[tokio::test]
async fn test_delete_workflow_with_running_execution_is_refused() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![WorkflowStep::new("s1", "slow").with_input(json!({ "sleep_ms": 400 }))],
        ))
        .await
        .unwrap();

    let execution = engine.start_workflow("wf1", None, None).await.unwrap();

    let err = engine.delete_workflow("wf1").await.unwrap_err();
    assert_eq!(err.code(), "WORKFLOW_ACTIVE_EXECUTIONS");
    assert!(engine.get_workflow("wf1").await.unwrap().is_some());

    engine.wait_for_terminal(execution.id, WAIT).await.unwrap();
    engine.delete_workflow("wf1").await.unwrap();
    assert!(engine.get_workflow("wf1").await.unwrap().is_none());

    // Executions are retained after definition deletion
    assert!(engine.get_execution(execution.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_start_missing_workflow() {
    let engine = engine();
    let err = engine.start_workflow("missing", None, None).await.unwrap_err();

    assert_eq!(err.code(), "WORKFLOW_NOT_FOUND");
    assert!(engine
        .list_executions(ExecutionFilter::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_metrics_counters_match_step_records() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![
                WorkflowStep::new("s1", "echo"),
                WorkflowStep::new("s2", "flaky").continue_on_error(),
                WorkflowStep::new("s3", "echo"),
            ],
        ))
        .await
        .unwrap();

    let execution = engine.start_workflow("wf1", None, None).await.unwrap();
    let finished = engine.wait_for_terminal(execution.id, WAIT).await.unwrap();

    let metrics = finished.metrics;
    assert_eq!(
        metrics.completed_steps + metrics.failed_steps,
        finished.step_executions.len()
    );
    assert_eq!(metrics.total_steps, 3);
    assert!(finished.step_executions.len() <= 3);
}

#[tokio::test]
async fn test_pause_is_idempotent_and_resume_continues() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![
                WorkflowStep::new("s1", "slow").with_input(json!({ "sleep_ms": 300 })),
                WorkflowStep::new("s2", "echo").with_input(json!({ "second": true })),
            ],
        ))
        .await
        .unwrap();

    let execution = engine.start_workflow("wf1", None, None).await.unwrap();

    // Pause while step 1 is in flight; the runner observes it at the next
    // step boundary.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let paused = engine.pause_execution(execution.id).await.unwrap();
    assert_eq!(paused.status, ExecutionStatus::Paused);

    // Second pause is a warn-level no-op, not an error
    let still_paused = engine.pause_execution(execution.id).await.unwrap();
    assert_eq!(still_paused.status, ExecutionStatus::Paused);

    // Let the in-flight step finish and the runner leave the loop
    tokio::time::sleep(Duration::from_millis(400)).await;
    let record = engine.get_execution(execution.id).await.unwrap().unwrap();
    assert_eq!(record.status, ExecutionStatus::Paused);
    assert_eq!(record.step_executions.len(), 1);

    // The re-spawned runner may already have finished the instant echo step
    // by the time the record is re-read.
    let resumed = engine.resume_execution(execution.id).await.unwrap();
    assert_ne!(resumed.status, ExecutionStatus::Paused);

    let finished = engine.wait_for_terminal(execution.id, WAIT).await.unwrap();
    assert_eq!(finished.status, ExecutionStatus::Completed);
    assert_eq!(finished.step_executions.len(), 2);
    assert_eq!(finished.step_executions[1].status, StepStatus::Completed);
}

#[tokio::test]
async fn test_resume_running_execution_is_noop() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![WorkflowStep::new("s1", "slow").with_input(json!({ "sleep_ms": 200 }))],
        ))
        .await
        .unwrap();

    let execution = engine.start_workflow("wf1", None, None).await.unwrap();
    let observed = engine.resume_execution(execution.id).await.unwrap();
    assert_eq!(observed.status, ExecutionStatus::Running);

    engine.wait_for_terminal(execution.id, WAIT).await.unwrap();
}

#[tokio::test]
async fn test_cancel_observed_at_step_boundary() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![
                WorkflowStep::new("s1", "slow").with_input(json!({ "sleep_ms": 150 })),
                WorkflowStep::new("s2", "echo"),
            ],
        ))
        .await
        .unwrap();

    let execution = engine.start_workflow("wf1", None, None).await.unwrap();

    let cancelled = engine.cancel_execution(execution.id).await.unwrap();
    assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());

    // The in-flight step still finishes; step 2 never starts
    tokio::time::sleep(Duration::from_millis(300)).await;
    let record = engine.get_execution(execution.id).await.unwrap().unwrap();
    assert_eq!(record.status, ExecutionStatus::Cancelled);
    assert!(record.step_executions.len() <= 1);

    // Cancelling a terminal execution is a warn-level no-op
    let observed = engine.cancel_execution(execution.id).await.unwrap();
    assert_eq!(observed.status, ExecutionStatus::Cancelled);
}

#[tokio::test]
async fn test_stop_workflow_cancels_running_execution() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![WorkflowStep::new("s1", "slow").with_input(json!({ "sleep_ms": 200 }))],
        ))
        .await
        .unwrap();

    let mut events = engine.subscribe().unwrap();
    let execution = engine.start_workflow("wf1", None, None).await.unwrap();

    let stopped = engine.stop_workflow(execution.id).await.unwrap();
    assert_eq!(stopped.status, ExecutionStatus::Cancelled);

    // workflow.started then workflow.cancelled on the bus
    assert_eq!(
        events.recv().await.unwrap().event_type,
        EngineEventType::WorkflowStarted
    );
    loop {
        let event = events.recv().await.unwrap();
        if event.event_type == EngineEventType::WorkflowCancelled {
            assert_eq!(event.execution_id, Some(execution.id));
            break;
        }
    }
}

#[tokio::test]
async fn test_context_flows_between_steps_via_mappings() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "Pipeline",
            vec![
                WorkflowStep::new("produce", "echo")
                    .with_input(json!({ "user": { "name": "Ada" } }))
                    .map_output("user_name", "user.name"),
                WorkflowStep::new("consume", "echo").map_input("greeting_for", "user_name"),
            ],
        ))
        .await
        .unwrap();

    let execution = engine.start_workflow("wf1", None, None).await.unwrap();
    let finished = engine.wait_for_terminal(execution.id, WAIT).await.unwrap();

    assert_eq!(finished.status, ExecutionStatus::Completed);
    assert_eq!(finished.context.get("user_name"), Some(&json!("Ada")));
    assert_eq!(
        finished.step_executions[1].input,
        json!({ "greeting_for": "Ada" })
    );
}

#[tokio::test]
async fn test_unknown_agent_fails_the_step() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![WorkflowStep::new("s1", "nonexistent")],
        ))
        .await
        .unwrap();

    let execution = engine.start_workflow("wf1", None, None).await.unwrap();
    let finished = engine.wait_for_terminal(execution.id, WAIT).await.unwrap();

    assert_eq!(finished.status, ExecutionStatus::Failed);
    let step_error = finished.step_executions[0].error.clone().unwrap();
    assert_eq!(step_error.code, "AGENT_NOT_FOUND");
}

#[tokio::test]
async fn test_execution_log_records_lifecycle() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![WorkflowStep::new("s1", "echo")],
        ))
        .await
        .unwrap();

    let execution = engine.start_workflow("wf1", None, None).await.unwrap();
    engine.wait_for_terminal(execution.id, WAIT).await.unwrap();

    let events = engine.execution_logs(execution.id).await.unwrap();
    let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            ExecutionEventType::StepStarted,
            ExecutionEventType::StepCompleted,
            ExecutionEventType::Completed,
        ]
    );
}

#[tokio::test]
async fn test_bus_publishes_step_and_workflow_events() {
    let engine = engine();
    let mut events = engine.subscribe().unwrap();

    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![WorkflowStep::new("s1", "echo")],
        ))
        .await
        .unwrap();

    let execution = engine.start_workflow("wf1", None, None).await.unwrap();
    engine.wait_for_terminal(execution.id, WAIT).await.unwrap();

    let mut seen = Vec::new();
    while seen.len() < 5 {
        seen.push(events.recv().await.unwrap().event_type);
    }

    assert_eq!(
        seen,
        vec![
            EngineEventType::WorkflowCreated,
            EngineEventType::WorkflowStarted,
            EngineEventType::StepStarted,
            EngineEventType::StepCompleted,
            EngineEventType::WorkflowCompleted,
        ]
    );
}

#[tokio::test]
async fn test_list_executions_filters_by_workflow_and_status() {
    let engine = engine();
    for id in ["wf1", "wf2"] {
        engine
            .create_workflow(WorkflowDefinition::new(
                id,
                "W",
                vec![WorkflowStep::new("s1", "echo")],
            ))
            .await
            .unwrap();
    }

    let a = engine.start_workflow("wf1", None, None).await.unwrap();
    let b = engine.start_workflow("wf2", None, None).await.unwrap();
    engine.wait_for_terminal(a.id, WAIT).await.unwrap();
    engine.wait_for_terminal(b.id, WAIT).await.unwrap();

    let wf1_only = engine
        .list_executions(ExecutionFilter {
            workflow_id: Some("wf1".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(wf1_only.len(), 1);
    assert_eq!(wf1_only[0].id, a.id);

    let completed = engine
        .list_executions(ExecutionFilter {
            status: Some(ExecutionStatus::Completed),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(completed.len(), 2);
}

#[tokio::test]
async fn test_concurrent_executions_are_independent() {
    let engine = engine();
    engine
        .create_workflow(WorkflowDefinition::new(
            "wf1",
            "W",
            vec![WorkflowStep::new("s1", "slow").with_input(json!({ "sleep_ms": 50 }))],
        ))
        .await
        .unwrap();

    let mut ids = Vec::new();
    for _ in 0..5 {
        ids.push(engine.start_workflow("wf1", None, None).await.unwrap().id);
    }

    for id in ids {
        let finished = engine.wait_for_terminal(id, WAIT).await.unwrap();
        assert_eq!(finished.status, ExecutionStatus::Completed);
    }

    let metrics = engine.metrics().await.unwrap();
    assert_eq!(metrics.executions_total, 5);
    assert_eq!(metrics.executions_completed, 5);
    assert!(metrics.avg_duration_ms.is_some());
}
