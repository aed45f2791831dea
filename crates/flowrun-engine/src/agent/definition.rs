//! Agent trait definition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error type for agent failures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentError {
    /// Error message
    pub message: String,

    /// Error code for programmatic handling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Whether retrying the invocation could succeed
    ///
    /// Informational: the engine records it on the step error details but
    /// does not itself loop retries.
    pub retryable: bool,

    /// Additional error details (for debugging)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AgentError {
    /// Create a retryable error
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            retryable: true,
            details: None,
        }
    }

    /// Create a non-retryable error
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            retryable: false,
            details: None,
        }
    }

    /// Set the error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Add error details
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AgentError {}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::retryable(format!("{err:#}"))
    }
}

/// Descriptive summary of a registered agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub description: String,
}

/// A capability unit invoked by workflow steps
///
/// The agent call is the engine's single suspension point: everything else in
/// the step loop is synchronous map and record manipulation. An agent that
/// never resolves blocks its execution's progress; the engine passes no
/// cancellation token.
///
/// # Example
///
/// ```ignore
/// struct EchoAgent;
///
/// #[async_trait]
/// impl Agent for EchoAgent {
///     fn id(&self) -> &str {
///         "echo"
///     }
///
///     fn description(&self) -> &str {
///         "Returns its input unchanged."
///     }
///
///     async fn execute(
///         &self,
///         input: Value,
///         _context: &Map<String, Value>,
///     ) -> Result<Value, AgentError> {
///         Ok(input)
///     }
/// }
/// ```
#[async_trait]
pub trait Agent: Send + Sync + 'static {
    /// Stable identifier steps bind to via `agent_id`
    fn id(&self) -> &str;

    /// Human-readable description for listings
    fn description(&self) -> &str {
        ""
    }

    /// Execute the step's effective input against this capability
    ///
    /// `context` is a read-only snapshot of the execution context taken at
    /// the step boundary; output flows back into the context through the
    /// step's output mapping, not by mutating `context`.
    async fn execute(
        &self,
        input: Value,
        context: &Map<String, Value>,
    ) -> Result<Value, AgentError>;

    /// Summary used by `Engine::list_agents`
    fn info(&self) -> AgentInfo {
        AgentInfo {
            id: self.id().to_string(),
            description: self.description().to_string(),
        }
    }
}
