//! Engine error taxonomy
//!
//! Store-level operations fail fast and synchronously with these errors.
//! Runner- and step-level failures are never surfaced here: they are captured
//! into the execution record and observed by polling or subscribing.

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Result type alias for engine operations
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// How severe an engine failure is, for triage and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Typed failures raised by the engine's synchronous surface
#[derive(Debug, Error)]
pub enum EngineError {
    /// No workflow definition with the given id
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    /// No execution record with the given id
    #[error("execution not found: {0}")]
    ExecutionNotFound(Uuid),

    /// Workflow cannot be deleted while executions of it are running
    #[error("workflow {workflow_id} has {running} running execution(s)")]
    ActiveExecutions { workflow_id: String, running: usize },

    /// Workflow definition failed validation
    #[error("workflow validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Store backend failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Event bus failure
    #[error("event bus error: {0}")]
    EventBus(#[from] crate::bus::EventBusError),

    /// An execution did not reach a terminal status within the wait deadline
    #[error("execution {0} did not reach a terminal status in time")]
    WaitTimeout(Uuid),
}

impl EngineError {
    /// Stable error code for programmatic handling
    pub fn code(&self) -> &'static str {
        match self {
            Self::WorkflowNotFound(_) => "WORKFLOW_NOT_FOUND",
            Self::ExecutionNotFound(_) => "EXECUTION_NOT_FOUND",
            Self::ActiveExecutions { .. } => "WORKFLOW_ACTIVE_EXECUTIONS",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Store(_) => "STORE_FAILURE",
            Self::EventBus(_) => "EVENT_BUS_FAILURE",
            Self::WaitTimeout(_) => "WAIT_TIMEOUT",
        }
    }

    /// Severity of this failure
    pub fn severity(&self) -> Severity {
        match self {
            Self::WorkflowNotFound(_) => Severity::Medium,
            Self::ExecutionNotFound(_) => Severity::Low,
            Self::ActiveExecutions { .. } => Severity::Medium,
            Self::Validation(_) => Severity::High,
            Self::Store(_) => Severity::Critical,
            Self::EventBus(_) => Severity::Medium,
            Self::WaitTimeout(_) => Severity::Low,
        }
    }
}

/// A rejected workflow definition, with one message per violated rule
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<String>,
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(issues: Vec<String>) -> Self {
        Self { issues }
    }

    pub fn single(issue: impl Into<String>) -> Self {
        Self {
            issues: vec![issue.into()],
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.issues.join("; "))
    }
}
