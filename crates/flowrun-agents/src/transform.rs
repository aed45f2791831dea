//! Transform agent

use async_trait::async_trait;
use flowrun_engine::{Agent, AgentError};
use serde_json::{json, Map, Value};

/// `{{key}}` template substitution
///
/// Input: `{ "template": "Hello {{name}}" }` plus any additional fields.
/// Placeholders resolve against the input's own fields first, then the
/// execution context (dotted paths allowed). Unresolved placeholders are left
/// in place.
///
/// Output: `{ "text": "Hello Ada" }`.
pub struct TransformAgent;

#[async_trait]
impl Agent for TransformAgent {
    fn id(&self) -> &str {
        "transform"
    }

    fn description(&self) -> &str {
        "Renders a {{key}} template from step input and execution context."
    }

    async fn execute(
        &self,
        input: Value,
        context: &Map<String, Value>,
    ) -> Result<Value, AgentError> {
        let template = input
            .get("template")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AgentError::non_retryable("missing 'template'").with_code("BAD_INPUT")
            })?;

        let text = render(template, &input, context);
        Ok(json!({ "text": text }))
    }
}

fn render(template: &str, input: &Value, context: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match resolve(key, input, context) {
                    Some(value) => out.push_str(&stringify(value)),
                    None => {
                        out.push_str("{{");
                        out.push_str(&after[..end]);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn resolve<'a>(key: &str, input: &'a Value, context: &'a Map<String, Value>) -> Option<&'a Value> {
    flowrun_engine::path::lookup(input, key).or_else(|| flowrun_engine::path::lookup_in(context, key))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
