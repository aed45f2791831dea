//! Lifecycle event bus
//!
//! The engine publishes workflow and step lifecycle notifications through the
//! [`EventBus`] trait. Publication is fire-and-forget from the engine's point
//! of view: the emit is awaited, but a bus failure propagates like any other
//! error and carries no special handling.
//!
//! [`BroadcastBus`] is the default implementation, fanning events out over a
//! tokio broadcast channel so callers can subscribe instead of polling.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Event kinds published on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEventType {
    #[serde(rename = "workflow.created")]
    WorkflowCreated,

    #[serde(rename = "workflow.started")]
    WorkflowStarted,

    #[serde(rename = "workflow.completed")]
    WorkflowCompleted,

    #[serde(rename = "workflow.failed")]
    WorkflowFailed,

    #[serde(rename = "workflow.cancelled")]
    WorkflowCancelled,

    #[serde(rename = "step.started")]
    StepStarted,

    #[serde(rename = "step.completed")]
    StepCompleted,

    #[serde(rename = "step.failed")]
    StepFailed,
}

impl std::fmt::Display for EngineEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::WorkflowCreated => "workflow.created",
            Self::WorkflowStarted => "workflow.started",
            Self::WorkflowCompleted => "workflow.completed",
            Self::WorkflowFailed => "workflow.failed",
            Self::WorkflowCancelled => "workflow.cancelled",
            Self::StepStarted => "step.started",
            Self::StepCompleted => "step.completed",
            Self::StepFailed => "step.failed",
        };
        write!(f, "{name}")
    }
}

/// A lifecycle notification published by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub event_type: EngineEventType,

    pub timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl EngineEvent {
    /// Create an event of the given type stamped with the current time
    pub fn new(event_type: EngineEventType) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type,
            timestamp: Utc::now(),
            workflow_id: None,
            execution_id: None,
            step_id: None,
            agent_id: None,
            data: None,
        }
    }

    /// Set the workflow id
    pub fn workflow(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    /// Set the execution id
    pub fn execution(mut self, execution_id: Uuid) -> Self {
        self.execution_id = Some(execution_id);
        self
    }

    /// Set the step id
    pub fn step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    /// Set the agent id
    pub fn agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Attach a payload
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Error from bus publication
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    /// The bus rejected or could not deliver the event
    #[error("event publication failed: {0}")]
    Publish(String),
}

/// Publish operation consumed by the engine
#[async_trait]
pub trait EventBus: Send + Sync + 'static {
    /// Publish one lifecycle event
    async fn emit(&self, event: EngineEvent) -> Result<(), EventBusError>;
}

/// Broadcast-channel bus
///
/// Events fan out to every live subscriber. Publishing with no subscribers is
/// not an error, and a slow subscriber lags (dropping its oldest events)
/// rather than blocking the engine.
pub struct BroadcastBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl BroadcastBus {
    /// Create a bus with the given per-subscriber buffer
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        Self { sender }
    }

    /// Subscribe to all events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventBus for BroadcastBus {
    async fn emit(&self, event: EngineEvent) -> Result<(), EventBusError> {
        // A send error only means there are no subscribers right now.
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// Bus that discards every event
pub struct NullBus;

#[async_trait]
impl EventBus for NullBus {
    async fn emit(&self, _event: EngineEvent) -> Result<(), EventBusError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_without_subscribers_is_ok() {
        let bus = BroadcastBus::new(8);
        bus.emit(EngineEvent::new(EngineEventType::WorkflowCreated))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = BroadcastBus::new(8);
        let mut rx = bus.subscribe();

        bus.emit(EngineEvent::new(EngineEventType::WorkflowStarted).workflow("wf1"))
            .await
            .unwrap();
        bus.emit(EngineEvent::new(EngineEventType::WorkflowCompleted).workflow("wf1"))
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap().event_type,
            EngineEventType::WorkflowStarted
        );
        assert_eq!(
            rx.recv().await.unwrap().event_type,
            EngineEventType::WorkflowCompleted
        );
    }

    #[tokio::test]
    async fn test_null_bus_discards() {
        let bus = NullBus;
        bus.emit(EngineEvent::new(EngineEventType::StepFailed))
            .await
            .unwrap();
    }

    #[test]
    fn test_event_type_wire_names() {
        let event = EngineEvent::new(EngineEventType::StepCompleted)
            .workflow("wf1")
            .step("s1");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"step.completed\""));
        assert_eq!(EngineEventType::WorkflowCancelled.to_string(), "workflow.cancelled");
    }
}
