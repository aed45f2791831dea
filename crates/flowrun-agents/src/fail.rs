//! Fail agent

use async_trait::async_trait;
use flowrun_engine::{Agent, AgentError};
use serde_json::{Map, Value};

/// Always fails
///
/// Input: `{ "message": "...", "retryable": bool }` (both optional). Exists to
/// exercise failure handling: continue-on-error flows, failed-step records,
/// and terminal `failed` executions.
pub struct FailAgent;

#[async_trait]
impl Agent for FailAgent {
    fn id(&self) -> &str {
        "fail"
    }

    fn description(&self) -> &str {
        "Fails every invocation; for testing failure paths."
    }

    async fn execute(
        &self,
        input: Value,
        _context: &Map<String, Value>,
    ) -> Result<Value, AgentError> {
        let message = input
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("fail agent invoked")
            .to_string();
        let retryable = input
            .get("retryable")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let error = if retryable {
            AgentError::retryable(message)
        } else {
            AgentError::non_retryable(message)
        };

        Err(error.with_code("INTENTIONAL_FAILURE"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fails_with_default_message() {
        let err = FailAgent.execute(json!({}), &Map::new()).await.unwrap_err();
        assert_eq!(err.message, "fail agent invoked");
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_fails_with_custom_message() {
        let err = FailAgent
            .execute(
                json!({ "message": "quota exceeded", "retryable": true }),
                &Map::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.message, "quota exceeded");
        assert!(err.retryable);
        assert_eq!(err.code.as_deref(), Some("INTENTIONAL_FAILURE"));
    }
}
