//! Orchestration engine facade
//!
//! Composes the workflow store, execution store, agent registry, and event
//! bus behind the public contract. The facade is the only component that
//! publishes to the bus for workflow-level lifecycle events; runner and step
//! executor publish on its behalf for executions they drive.

mod runner;
mod step;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::agent::{Agent, AgentInfo, AgentRegistry};
use crate::bus::{BroadcastBus, EngineEvent, EngineEventType, EventBus};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::metrics::{EngineMetrics, HealthStatus};
use crate::store::{
    ExecutionFilter, ExecutionStore, InMemoryExecutionStore, InMemoryWorkflowStore, StoreError,
    WorkflowFilter, WorkflowStore,
};
use crate::workflow::{
    ExecutionEvent, ExecutionStatus, WorkflowDefinition, WorkflowExecution, WorkflowPatch,
};

use runner::WorkflowRunner;

/// The workflow orchestration engine
///
/// Construct with injected dependencies via [`Engine::new`], or use
/// [`Engine::in_memory`] for the reference in-memory configuration. Multiple
/// engine instances coexist freely; there is no global state.
///
/// # Example
///
/// ```ignore
/// let engine = Engine::in_memory();
/// engine.register_agent(Arc::new(EchoAgent));
///
/// engine.create_workflow(WorkflowDefinition::new(
///     "wf1",
///     "Greeting",
///     vec![WorkflowStep::new("s1", "echo")],
/// )).await?;
///
/// let execution = engine.start_workflow("wf1", Some(json!({ "msg": "hi" })), None).await?;
/// let finished = engine.wait_for_terminal(execution.id, Duration::from_secs(5)).await?;
/// ```
pub struct Engine {
    workflows: Arc<dyn WorkflowStore>,
    executions: Arc<dyn ExecutionStore>,
    agents: Arc<AgentRegistry>,
    bus: Arc<dyn EventBus>,
    broadcast: Option<Arc<BroadcastBus>>,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine with injected dependencies
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
        agents: Arc<AgentRegistry>,
        bus: Arc<dyn EventBus>,
        config: EngineConfig,
    ) -> Self {
        Self {
            workflows,
            executions,
            agents,
            bus,
            broadcast: None,
            config,
        }
    }

    /// Create an engine on in-memory stores with a broadcast bus
    pub fn in_memory() -> Self {
        Self::in_memory_with_config(EngineConfig::default())
    }

    /// In-memory engine with custom configuration
    pub fn in_memory_with_config(config: EngineConfig) -> Self {
        let bus = Arc::new(BroadcastBus::new(config.bus_buffer));
        Self {
            workflows: Arc::new(InMemoryWorkflowStore::new()),
            executions: Arc::new(InMemoryExecutionStore::new()),
            agents: Arc::new(AgentRegistry::new()),
            bus: bus.clone(),
            broadcast: Some(bus),
            config,
        }
    }

    /// Subscribe to lifecycle events
    ///
    /// Available when the engine owns a [`BroadcastBus`] (the in-memory
    /// configuration); engines built on an injected bus subscribe at the bus
    /// they injected.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<EngineEvent>> {
        self.broadcast.as_ref().map(|bus| bus.subscribe())
    }

    // =========================================================================
    // Workflow CRUD
    // =========================================================================

    /// Validate and persist a workflow definition
    ///
    /// A definition with an existing id overwrites it (last write wins).
    #[instrument(skip(self, definition), fields(workflow_id = %definition.id))]
    pub async fn create_workflow(
        &self,
        definition: WorkflowDefinition,
    ) -> Result<WorkflowDefinition> {
        definition.validate()?;

        self.workflows.put(definition.clone()).await?;
        self.bus
            .emit(
                EngineEvent::new(EngineEventType::WorkflowCreated)
                    .workflow(&definition.id)
                    .with_data(serde_json::json!({ "name": definition.name })),
            )
            .await?;

        info!(workflow_id = %definition.id, "workflow created");
        Ok(definition)
    }

    /// Merge a partial update into an existing definition
    #[instrument(skip(self, patch))]
    pub async fn update_workflow(
        &self,
        workflow_id: &str,
        patch: WorkflowPatch,
    ) -> Result<WorkflowDefinition> {
        let updated = self
            .workflows
            .update(workflow_id, patch)
            .await
            .map_err(not_found_workflow)?;

        info!(workflow_id, "workflow updated");
        Ok(updated)
    }

    /// Fetch a definition; a miss is `None`, not an error
    pub async fn get_workflow(&self, workflow_id: &str) -> Result<Option<WorkflowDefinition>> {
        Ok(self.workflows.get(workflow_id).await?)
    }

    /// List definitions matching the filter
    pub async fn list_workflows(&self, filter: WorkflowFilter) -> Result<Vec<WorkflowDefinition>> {
        Ok(self.workflows.list(&filter).await?)
    }

    /// Delete a definition, refusing while executions of it are running
    ///
    /// Executions are retained, not cascaded.
    #[instrument(skip(self))]
    pub async fn delete_workflow(&self, workflow_id: &str) -> Result<()> {
        if self.workflows.get(workflow_id).await?.is_none() {
            return Err(EngineError::WorkflowNotFound(workflow_id.to_string()));
        }

        let running = self.executions.count_running(workflow_id).await?;
        if running > 0 {
            return Err(EngineError::ActiveExecutions {
                workflow_id: workflow_id.to_string(),
                running,
            });
        }

        self.workflows
            .delete(workflow_id)
            .await
            .map_err(not_found_workflow)?;

        info!(workflow_id, "workflow deleted");
        Ok(())
    }

    // =========================================================================
    // Execution lifecycle
    // =========================================================================

    /// Start an execution of a workflow
    ///
    /// Returns the freshly allocated record immediately; the step loop runs
    /// as a detached, supervised background task. Runner failures are
    /// captured into the record, never rethrown here.
    #[instrument(skip(self, input, context))]
    pub async fn start_workflow(
        &self,
        workflow_id: &str,
        input: Option<Value>,
        context: Option<Map<String, Value>>,
    ) -> Result<WorkflowExecution> {
        let workflow = self
            .workflows
            .get(workflow_id)
            .await?
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))?;

        let execution = WorkflowExecution::new(
            workflow_id,
            input.unwrap_or(Value::Null),
            context,
            workflow.steps.len(),
        );
        let execution_id = execution.id;

        self.executions.create(execution.clone()).await?;
        self.bus
            .emit(
                EngineEvent::new(EngineEventType::WorkflowStarted)
                    .workflow(workflow_id)
                    .execution(execution_id),
            )
            .await?;

        info!(workflow_id, %execution_id, "execution started");
        self.spawn_runner(workflow, execution_id, 0);

        Ok(execution)
    }

    /// Alias for [`Engine::start_workflow`]
    pub async fn execute_workflow(
        &self,
        workflow_id: &str,
        input: Option<Value>,
        context: Option<Map<String, Value>>,
    ) -> Result<WorkflowExecution> {
        self.start_workflow(workflow_id, input, context).await
    }

    /// Pause a running execution
    ///
    /// Observed by the runner at its next step boundary; an in-flight agent
    /// call is not interrupted. Pausing a non-running execution is a
    /// warn-level no-op, not an error.
    #[instrument(skip(self))]
    pub async fn pause_execution(&self, execution_id: Uuid) -> Result<WorkflowExecution> {
        let execution = self.require_execution(execution_id).await?;

        if execution.status != ExecutionStatus::Running {
            warn!(%execution_id, status = %execution.status, "cannot pause execution that is not running");
            return Ok(execution);
        }

        self.executions
            .set_status(execution_id, ExecutionStatus::Paused)
            .await?;
        info!(%execution_id, "execution paused");

        self.require_execution(execution_id).await
    }

    /// Resume a paused execution
    ///
    /// Sets the status back to running and re-spawns the runner from the
    /// first unexecuted step. Resuming a non-paused execution is a warn-level
    /// no-op.
    #[instrument(skip(self))]
    pub async fn resume_execution(&self, execution_id: Uuid) -> Result<WorkflowExecution> {
        let execution = self.require_execution(execution_id).await?;

        if execution.status != ExecutionStatus::Paused {
            warn!(%execution_id, status = %execution.status, "cannot resume execution that is not paused");
            return Ok(execution);
        }

        let workflow = self
            .workflows
            .get(&execution.workflow_id)
            .await?
            .ok_or_else(|| EngineError::WorkflowNotFound(execution.workflow_id.clone()))?;

        self.executions
            .set_status(execution_id, ExecutionStatus::Running)
            .await?;
        info!(%execution_id, "execution resumed");

        self.spawn_runner(workflow, execution_id, execution.step_executions.len());

        self.require_execution(execution_id).await
    }

    /// Cancel a running or paused execution
    ///
    /// Cooperative: an in-flight step is not interrupted; the runner observes
    /// the cancelled status at its next boundary check.
    #[instrument(skip(self))]
    pub async fn cancel_execution(&self, execution_id: Uuid) -> Result<WorkflowExecution> {
        let execution = self.require_execution(execution_id).await?;

        if !matches!(
            execution.status,
            ExecutionStatus::Running | ExecutionStatus::Paused
        ) {
            warn!(%execution_id, status = %execution.status, "cannot cancel execution in this state");
            return Ok(execution);
        }

        self.executions
            .finish(execution_id, ExecutionStatus::Cancelled, None, None)
            .await?;
        info!(%execution_id, "execution cancelled");

        self.require_execution(execution_id).await
    }

    /// Stop a running execution, publishing `workflow.cancelled`
    #[instrument(skip(self))]
    pub async fn stop_workflow(&self, execution_id: Uuid) -> Result<WorkflowExecution> {
        let execution = self.require_execution(execution_id).await?;

        if execution.status != ExecutionStatus::Running {
            warn!(%execution_id, status = %execution.status, "cannot stop execution that is not running");
            return Ok(execution);
        }

        self.executions
            .finish(execution_id, ExecutionStatus::Cancelled, None, None)
            .await?;
        self.bus
            .emit(
                EngineEvent::new(EngineEventType::WorkflowCancelled)
                    .workflow(&execution.workflow_id)
                    .execution(execution_id),
            )
            .await?;
        info!(%execution_id, "execution stopped");

        self.require_execution(execution_id).await
    }

    /// Fetch an execution record; a miss is `None`, not an error
    pub async fn get_execution(&self, execution_id: Uuid) -> Result<Option<WorkflowExecution>> {
        Ok(self.executions.get(execution_id).await?)
    }

    /// List execution records matching the filter
    pub async fn list_executions(
        &self,
        filter: ExecutionFilter,
    ) -> Result<Vec<WorkflowExecution>> {
        Ok(self.executions.list(&filter).await?)
    }

    /// An execution's audit log, or empty for an unknown id
    pub async fn execution_logs(&self, execution_id: Uuid) -> Result<Vec<ExecutionEvent>> {
        Ok(self
            .executions
            .get(execution_id)
            .await?
            .map(|e| e.events)
            .unwrap_or_default())
    }

    /// Poll until the execution reaches a terminal status
    pub async fn wait_for_terminal(
        &self,
        execution_id: Uuid,
        timeout: Duration,
    ) -> Result<WorkflowExecution> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let execution = self.require_execution(execution_id).await?;
            if execution.status.is_terminal() {
                return Ok(execution);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(EngineError::WaitTimeout(execution_id));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    // =========================================================================
    // Agents
    // =========================================================================

    /// Register an agent under its own id
    pub fn register_agent(&self, agent: Arc<dyn Agent>) {
        let id = agent.id().to_string();
        if self.agents.register(agent).is_some() {
            warn!(agent_id = %id, "replaced previously registered agent");
        } else {
            info!(agent_id = %id, "agent registered");
        }
    }

    /// Remove an agent; returns whether it was registered
    pub fn unregister_agent(&self, agent_id: &str) -> bool {
        let removed = self.agents.unregister(agent_id);
        if removed {
            info!(agent_id, "agent unregistered");
        } else {
            warn!(agent_id, "cannot unregister unknown agent");
        }
        removed
    }

    /// Resolve an agent by id
    pub fn get_agent(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(agent_id)
    }

    /// Summaries of all registered agents
    pub fn list_agents(&self) -> Vec<AgentInfo> {
        self.agents.list()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Engine health snapshot
    pub async fn health_status(&self) -> Result<HealthStatus> {
        let running = self
            .executions
            .list(&ExecutionFilter {
                status: Some(ExecutionStatus::Running),
                ..Default::default()
            })
            .await?
            .len();

        Ok(HealthStatus {
            healthy: true,
            workflows: self.workflows.count().await?,
            executions: self.executions.count().await?,
            running_executions: running,
            registered_agents: self.agents.len(),
            timestamp: chrono::Utc::now(),
        })
    }

    /// Aggregate execution metrics
    pub async fn metrics(&self) -> Result<EngineMetrics> {
        let executions = self.executions.list(&ExecutionFilter::default()).await?;

        let mut metrics = EngineMetrics {
            executions_total: executions.len(),
            ..Default::default()
        };

        let mut durations = Vec::new();
        for execution in &executions {
            match execution.status {
                ExecutionStatus::Running | ExecutionStatus::Pending => {
                    metrics.executions_running += 1
                }
                ExecutionStatus::Paused => metrics.executions_paused += 1,
                ExecutionStatus::Completed => metrics.executions_completed += 1,
                ExecutionStatus::Failed => metrics.executions_failed += 1,
                ExecutionStatus::Cancelled => metrics.executions_cancelled += 1,
            }
            if let Some(duration) = execution.duration_ms {
                durations.push(duration as f64);
            }
        }

        if !durations.is_empty() {
            metrics.avg_duration_ms = Some(durations.iter().sum::<f64>() / durations.len() as f64);
        }

        Ok(metrics)
    }

    // =========================================================================
    // Internal
    // =========================================================================

    async fn require_execution(&self, execution_id: Uuid) -> Result<WorkflowExecution> {
        self.executions
            .get(execution_id)
            .await?
            .ok_or(EngineError::ExecutionNotFound(execution_id))
    }

    /// Spawn the runner as a detached task with a supervisor
    ///
    /// The supervisor converts runner infrastructure errors and panics into a
    /// recorded execution failure, preserving the contract that execution
    /// outcome is observed via the record rather than a thrown error.
    fn spawn_runner(&self, workflow: WorkflowDefinition, execution_id: Uuid, start_index: usize) {
        let runner = WorkflowRunner::new(
            self.executions.clone(),
            self.agents.clone(),
            self.bus.clone(),
        );
        let workflow_id = workflow.id.clone();

        let task = tokio::spawn({
            let runner = runner.clone();
            async move { runner.run(workflow, execution_id, start_index).await }
        });

        tokio::spawn(async move {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(%execution_id, error = %err, "workflow runner failed");
                    runner
                        .record_fault(execution_id, &workflow_id, err.to_string())
                        .await;
                }
                Err(join_err) => {
                    error!(%execution_id, "workflow runner panicked");
                    runner
                        .record_fault(
                            execution_id,
                            &workflow_id,
                            format!("runner task panicked: {join_err}"),
                        )
                        .await;
                }
            }
        });
    }
}

fn not_found_workflow(err: StoreError) -> EngineError {
    match err {
        StoreError::WorkflowNotFound(id) => EngineError::WorkflowNotFound(id),
        other => EngineError::Store(other),
    }
}
