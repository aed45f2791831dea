//! Echo agent

use async_trait::async_trait;
use flowrun_engine::{Agent, AgentError};
use serde_json::{Map, Value};

/// Returns its input unchanged
///
/// Useful as a pipeline pass-through and as the simplest possible fixture in
/// tests and examples.
pub struct EchoAgent;

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
