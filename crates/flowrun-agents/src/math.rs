//! Math agent

use async_trait::async_trait;
use flowrun_engine::{Agent, AgentError};
use serde_json::{json, Map, Value};

/// Basic arithmetic over two operands
///
/// Input: `{ "op": "add" | "subtract" | "multiply" | "divide", "a": n, "b": n }`.
/// Output: `{ "result": n }`.
pub struct MathAgent;

#[async_trait]
impl Agent for MathAgent {
    fn id(&self) -> &str {
        "math"
    }

    fn description(&self) -> &str {
        "Applies add, subtract, multiply, or divide to two operands."
    }

    async fn execute(
        &self,
        input: Value,
        _context: &Map<String, Value>,
    ) -> Result<Value, AgentError> {
        let op = input
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::non_retryable("missing 'op'").with_code("BAD_INPUT"))?;
        let a = operand(&input, "a")?;
        let b = operand(&input, "b")?;

        let result = match op {
            "add" => a + b,
            "subtract" => a - b,
            "multiply" => a * b,
            "divide" => {
                if b == 0.0 {
                    return Err(
                        AgentError::non_retryable("division by zero").with_code("DIVIDE_BY_ZERO")
                    );
                }
                a / b
            }
            other => {
                return Err(
                    AgentError::non_retryable(format!("unknown op '{other}'"))
                        .with_code("BAD_INPUT"),
                )
            }
        };

        Ok(json!({ "result": result }))
    }
}

fn operand(input: &Value, name: &str) -> Result<f64, AgentError> {
    input
        .get(name)
        .and_then(Value::as_f64)
        .ok_or_else(|| {
            AgentError::non_retryable(format!("missing numeric operand '{name}'"))
                .with_code("BAD_INPUT")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(input: Value) -> Result<Value, AgentError> {
        MathAgent.execute(input, &Map::new()).await
    }

    #[tokio::test]
    async fn test_operations() {
        assert_eq!(
            run(json!({ "op": "add", "a": 2, "b": 3 })).await.unwrap(),
            json!({ "result": 5.0 })
        );
        assert_eq!(
            run(json!({ "op": "multiply", "a": 4, "b": 2.5 }))
                .await
                .unwrap(),
            json!({ "result": 10.0 })
        );
    }

    #[tokio::test]
    async fn test_divide_by_zero_fails() {
        let err = run(json!({ "op": "divide", "a": 1, "b": 0 }))
            .await
            .unwrap_err();
        assert_eq!(err.code.as_deref(), Some("DIVIDE_BY_ZERO"));
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_missing_operand_fails() {
        let err = run(json!({ "op": "add", "a": 1 })).await.unwrap_err();
        assert_eq!(err.code.as_deref(), Some("BAD_INPUT"));
    }

    #[tokio::test]
    async fn test_unknown_op_fails() {
        let err = run(json!({ "op": "modulo", "a": 1, "b": 2 }))
            .await
            .unwrap_err();
        assert!(err.message.contains("modulo"));
    }
}
