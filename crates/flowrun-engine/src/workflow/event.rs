//! Per-execution audit events
//!
//! Each execution carries an append-only event log, exposed via
//! `Engine::execution_logs`. These are distinct from the bus notifications in
//! [`crate::bus`]: the log is the execution's own replayable history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Event kinds recorded in an execution's log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionEventType {
    #[serde(rename = "step-started")]
    StepStarted,

    #[serde(rename = "step-completed")]
    StepCompleted,

    #[serde(rename = "step-failed")]
    StepFailed,

    /// Execution reached `completed`
    #[serde(rename = "completed")]
    Completed,

    /// Execution reached `failed`
    #[serde(rename = "failed")]
    Failed,
}

/// One entry in an execution's append-only log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub event_type: ExecutionEventType,

    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ExecutionEvent {
    fn new(event_type: ExecutionEventType) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type,
            timestamp: Utc::now(),
            step_id: None,
            agent_id: None,
            message: None,
            data: None,
        }
    }

    /// A step began executing
    pub fn step_started(step_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        let mut event = Self::new(ExecutionEventType::StepStarted);
        event.step_id = Some(step_id.into());
        event.agent_id = Some(agent_id.into());
        event
    }

    /// A step finished successfully
    pub fn step_completed(step_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        let mut event = Self::new(ExecutionEventType::StepCompleted);
        event.step_id = Some(step_id.into());
        event.agent_id = Some(agent_id.into());
        event
    }

    /// A step failed
    pub fn step_failed(
        step_id: impl Into<String>,
        agent_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut event = Self::new(ExecutionEventType::StepFailed);
        event.step_id = Some(step_id.into());
        event.agent_id = Some(agent_id.into());
        event.message = Some(message.into());
        event
    }

    /// The execution completed successfully
    pub fn completed(data: Option<Value>) -> Self {
        let mut event = Self::new(ExecutionEventType::Completed);
        event.data = data;
        event
    }

    /// The execution failed
    pub fn failed(message: impl Into<String>) -> Self {
        let mut event = Self::new(ExecutionEventType::Failed);
        event.message = Some(message.into());
        event
    }
}
