//! Execution records
//!
//! One `WorkflowExecution` per run. The record is mutated only by the runner
//! and step executor acting on its behalf, and is retained after terminal
//! transition for audit and listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::ExecutionEvent;

/// Execution lifecycle status
///
/// `Pending` is the record's logical initial state between allocation and the
/// first status write; the runner marks the record `Running` effectively
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Whether this status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Status of a single step attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

/// Error recorded on a failed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepError {
    /// Stable code, e.g. `STEP_EXECUTION_FAILED` or `AGENT_NOT_FOUND`
    pub code: String,

    pub message: String,

    /// Source error chain or agent-provided detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Record of one step attempt, appended in step order and never removed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepExecution {
    pub step_id: String,

    pub status: StepStatus,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,

    /// Effective input after input mapping
    pub input: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,

    /// Always 1; the engine does not loop retries
    pub attempts: u32,

    /// Informational cap from the step's retry policy
    pub max_attempts: u32,
}

impl StepExecution {
    /// Create a running step record for the given effective input
    pub fn started(step_id: impl Into<String>, input: Value, max_attempts: u32) -> Self {
        Self {
            step_id: step_id.into(),
            status: StepStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            input,
            output: None,
            error: None,
            attempts: 1,
            max_attempts,
        }
    }

    /// Mark the step completed with the agent's output
    pub fn complete(&mut self, output: Value) {
        let now = Utc::now();
        self.status = StepStatus::Completed;
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
        self.completed_at = Some(now);
        self.output = Some(output);
    }

    /// Mark the step failed
    pub fn fail(&mut self, error: StepError) {
        let now = Utc::now();
        self.status = StepStatus::Failed;
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
        self.completed_at = Some(now);
        self.error = Some(error);
    }
}

/// Per-execution step counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub total_steps: usize,
    pub completed_steps: usize,
    pub failed_steps: usize,
}

/// Error recorded on a failed execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionError {
    /// Stable code, `WORKFLOW_EXECUTION_FAILED` for runner-level failures
    pub code: String,

    pub message: String,

    pub timestamp: DateTime<Utc>,
}

impl ExecutionError {
    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self {
            code: "WORKFLOW_EXECUTION_FAILED".to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Summary metadata attached to a terminal result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub execution_time_ms: i64,
    pub steps_executed: usize,
    pub steps_succeeded: usize,
    pub steps_failed: usize,
}

/// Terminal outcome of an execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,

    /// Non-empty step outputs keyed by step id
    pub outputs: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub metadata: ResultMetadata,
}

/// One run of a workflow definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// Generated identifier (UUID v7, time-ordered)
    pub id: Uuid,

    pub workflow_id: String,

    pub status: ExecutionStatus,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,

    /// Duration in milliseconds, computed at terminal transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,

    /// Input supplied at start
    pub input: Value,

    /// Mutable scratch space carried through the execution
    pub context: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step_id: Option<String>,

    pub step_executions: Vec<StepExecution>,

    /// Append-only audit log
    pub events: Vec<ExecutionEvent>,

    pub metrics: ExecutionMetrics,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
}

impl WorkflowExecution {
    /// Allocate a new execution record in the `Running` state
    ///
    /// The context is seeded from the input's top-level object fields,
    /// overlaid with the explicit `context` argument.
    pub fn new(
        workflow_id: impl Into<String>,
        input: Value,
        context: Option<Map<String, Value>>,
        total_steps: usize,
    ) -> Self {
        let now = Utc::now();

        let mut seeded = match &input {
            Value::Object(fields) => fields.clone(),
            _ => Map::new(),
        };
        if let Some(explicit) = context {
            seeded.extend(explicit);
        }

        Self {
            id: Uuid::now_v7(),
            workflow_id: workflow_id.into(),
            status: ExecutionStatus::Running,
            started_at: now,
            completed_at: None,
            updated_at: now,
            duration_ms: None,
            input,
            context: seeded,
            current_step_id: None,
            step_executions: vec![],
            events: vec![],
            metrics: ExecutionMetrics {
                total_steps,
                completed_steps: 0,
                failed_steps: 0,
            },
            error: None,
            result: None,
        }
    }

    /// Counts of completed and failed steps over the records so far
    pub fn step_counts(&self) -> (usize, usize) {
        let completed = self
            .step_executions
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count();
        let failed = self
            .step_executions
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count();
        (completed, failed)
    }

    /// Non-empty step outputs keyed by step id
    pub fn outputs(&self) -> Map<String, Value> {
        self.step_executions
            .iter()
            .filter_map(|s| match &s.output {
                Some(output) if !output.is_null() => Some((s.step_id.clone(), output.clone())),
                _ => None,
            })
            .collect()
    }
}
