//! Delay agent

use std::time::Duration;

use async_trait::async_trait;
use flowrun_engine::{Agent, AgentError};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Longest delay the agent accepts, to keep executions cancellable in
/// reasonable time (cancellation is only observed between steps).
const MAX_DELAY_MS: u64 = 5 * 60 * 1000;

/// Sleeps for a requested duration
///
/// Input: `{ "duration_ms": n }` (default 1000). Output: `{ "slept_ms": n }`.
pub struct DelayAgent;

#[async_trait]
impl Agent for DelayAgent {
    fn id(&self) -> &str {
        "delay"
    }

    fn description(&self) -> &str {
        "Waits for the requested number of milliseconds."
    }

    async fn execute(
        &self,
        input: Value,
        _context: &Map<String, Value>,
    ) -> Result<Value, AgentError> {
        let ms = input
            .get("duration_ms")
            .and_then(Value::as_u64)
            .unwrap_or(1000);

        if ms > MAX_DELAY_MS {
            return Err(AgentError::non_retryable(format!(
                "duration_ms {ms} exceeds the maximum of {MAX_DELAY_MS}"
            ))
            .with_code("BAD_INPUT"));
        }

        debug!(duration_ms = ms, "delay agent sleeping");
        tokio::time::sleep(Duration::from_millis(ms)).await;

        Ok(json!({ "slept_ms": ms }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleeps_and_reports() {
        let started = std::time::Instant::now();
        let output = DelayAgent
            .execute(json!({ "duration_ms": 20 }), &Map::new())
            .await
            .unwrap();

        assert_eq!(output, json!({ "slept_ms": 20 }));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_rejects_excessive_delay() {
        let err = DelayAgent
            .execute(json!({ "duration_ms": MAX_DELAY_MS + 1 }), &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.code.as_deref(), Some("BAD_INPUT"));
    }
}
