//! HTTP request agent

use std::time::Duration;

use async_trait::async_trait;
use flowrun_engine::{Agent, AgentError};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Timeout for the whole request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-in/JSON-out HTTP requests
///
/// Input:
///
/// ```json
/// {
///   "method": "GET",
///   "url": "https://api.example.com/items",
///   "headers": { "authorization": "Bearer ..." },
///   "body": { "any": "json" }
/// }
/// ```
///
/// Output: `{ "status": 200, "body": <json or string> }`. Non-2xx responses
/// are returned, not treated as failures; transport errors fail the step with
/// a retryable error.
pub struct HttpRequestAgent {
    client: reqwest::Client,
}

impl HttpRequestAgent {
    /// Create an agent with its own connection pool
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("default reqwest client"),
        }
    }

    /// Create an agent over an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpRequestAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for HttpRequestAgent {
    fn id(&self) -> &str {
        "http-request"
    }

    fn description(&self) -> &str {
        "Performs an HTTP request and returns status and body."
    }

    async fn execute(
        &self,
        input: Value,
        _context: &Map<String, Value>,
    ) -> Result<Value, AgentError> {
        let url = input
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| AgentError::non_retryable("missing 'url'").with_code("BAD_INPUT"))?;
        let method = parse_method(input.get("method").and_then(Value::as_str).unwrap_or("GET"))?;

        debug!(%method, url, "http agent sending request");

        let mut request = self.client.request(method, url);
        if let Some(Value::Object(headers)) = input.get("headers") {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name, value);
                }
            }
        }
        if let Some(body) = input.get("body") {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| AgentError::retryable(err.to_string()).with_code("HTTP_TRANSPORT"))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| AgentError::retryable(err.to_string()).with_code("HTTP_TRANSPORT"))?;

        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        Ok(json!({ "status": status, "body": body }))
    }
}

fn parse_method(name: &str) -> Result<Method, AgentError> {
    match name.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "HEAD" => Ok(Method::HEAD),
        _ => Err(
            AgentError::non_retryable(format!("unsupported HTTP method '{name}'"))
                .with_code("BAD_INPUT"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_url_fails() {
        let err = HttpRequestAgent::new()
            .execute(json!({ "method": "GET" }), &Map::new())
            .await
            .unwrap_err();
        assert_eq!(err.code.as_deref(), Some("BAD_INPUT"));
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("get").unwrap(), Method::GET);
        assert_eq!(parse_method("POST").unwrap(), Method::POST);
        assert!(parse_method("teapot").is_err());
    }
}
