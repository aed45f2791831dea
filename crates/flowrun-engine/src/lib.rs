//! # Flowrun Engine
//!
//! A workflow orchestration engine: it stores workflow definitions (ordered
//! steps bound to executable agents), launches executions, drives each
//! execution through a sequential step state machine, and records the
//! resulting history as replayable events.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Engine                              │
//! │   (public contract, composes the parts, publishes events)   │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                     │
//!          ▼                    ▼                     ▼
//! ┌────────────────┐  ┌──────────────────┐  ┌─────────────────┐
//! │ WorkflowRunner │  │  Workflow store  │  │  AgentRegistry  │
//! │  StepExecutor  │  │  Execution store │  │  (capabilities) │
//! └────────────────┘  └──────────────────┘  └─────────────────┘
//! ```
//!
//! Callers submit definitions and start executions; the runner drives the
//! step loop as a detached, supervised background task. Execution outcome is
//! observed by polling the record or subscribing to the event bus, never by
//! catching an error at start time.
//!
//! ## Example
//!
//! ```ignore
//! use flowrun_engine::prelude::*;
//!
//! let engine = Engine::in_memory();
//! engine.register_agent(Arc::new(EchoAgent));
//!
//! engine.create_workflow(WorkflowDefinition::new(
//!     "wf1",
//!     "Greeting",
//!     vec![WorkflowStep::new("s1", "echo").with_input(json!({ "msg": "hi" }))],
//! )).await?;
//!
//! let execution = engine.start_workflow("wf1", None, None).await?;
//! let finished = engine
//!     .wait_for_terminal(execution.id, Duration::from_secs(5))
//!     .await?;
//! assert_eq!(finished.status, ExecutionStatus::Completed);
//! ```

pub mod agent;
pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod path;
pub mod store;
pub mod workflow;

/// Prelude for common imports
pub mod prelude {
    pub use crate::agent::{Agent, AgentError, AgentInfo, AgentRegistry};
    pub use crate::bus::{BroadcastBus, EngineEvent, EngineEventType, EventBus, NullBus};
    pub use crate::config::EngineConfig;
    pub use crate::engine::Engine;
    pub use crate::error::{EngineError, Result, Severity, ValidationError};
    pub use crate::metrics::{EngineMetrics, HealthStatus};
    pub use crate::store::{
        ExecutionFilter, ExecutionStore, InMemoryExecutionStore, InMemoryWorkflowStore,
        StoreError, WorkflowFilter, WorkflowStore,
    };
    pub use crate::workflow::{
        ExecutionError, ExecutionEvent, ExecutionEventType, ExecutionMetrics, ExecutionResult,
        ExecutionStatus, ResultMetadata, RetryPolicy, StepError, StepExecution, StepStatus,
        WorkflowDefinition, WorkflowExecution, WorkflowPatch, WorkflowStep,
    };
}

// Re-export key types at crate root
pub use agent::{Agent, AgentError, AgentInfo, AgentRegistry};
pub use bus::{BroadcastBus, EngineEvent, EngineEventType, EventBus, NullBus};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result, Severity, ValidationError};
pub use metrics::{EngineMetrics, HealthStatus};
pub use store::{
    ExecutionFilter, ExecutionStore, InMemoryExecutionStore, InMemoryWorkflowStore, StoreError,
    WorkflowFilter, WorkflowStore,
};
pub use workflow::{
    ExecutionError, ExecutionEvent, ExecutionEventType, ExecutionMetrics, ExecutionResult,
    ExecutionStatus, ResultMetadata, RetryPolicy, StepError, StepExecution, StepStatus,
    WorkflowDefinition, WorkflowExecution, WorkflowPatch, WorkflowStep,
};
