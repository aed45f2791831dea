//! Simple Workflow Example - a three-step pipeline end to end
//!
//! Defines a workflow that computes a total, renders a message from it, and
//! echoes the result, then runs it and prints the execution record.
//!
//! Run with: cargo run -p flowrun-agents --example simple_workflow

use std::sync::Arc;
use std::time::Duration;

use flowrun_agents::{EchoAgent, MathAgent, TransformAgent};
use flowrun_engine::prelude::*;
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Simple Workflow (flowrun) ===\n");

    // 1. Engine on in-memory stores, with the built-in agents registered
    let engine = Engine::in_memory();
    engine.register_agent(Arc::new(MathAgent));
    engine.register_agent(Arc::new(TransformAgent));
    engine.register_agent(Arc::new(EchoAgent));

    // 2. Three steps: compute -> render -> echo, wired through the context
    engine
        .create_workflow(WorkflowDefinition::new(
            "order-total",
            "Order Total",
            vec![
                WorkflowStep::new("compute", "math")
                    .with_input(json!({ "op": "multiply" }))
                    .map_input("a", "quantity")
                    .map_input("b", "unit_price")
                    .map_output("total", "result"),
                WorkflowStep::new("render", "transform")
                    .with_input(json!({ "template": "Order total is {{total}}" }))
                    .map_output("message", "text"),
                WorkflowStep::new("deliver", "echo").map_input("message", "message"),
            ],
        ))
        .await?;

    // 3. Start an execution and wait for its terminal state
    let execution = engine
        .start_workflow(
            "order-total",
            Some(json!({ "quantity": 3, "unit_price": 4.5 })),
            None,
        )
        .await?;
    println!("started execution {}\n", execution.id);

    let finished = engine
        .wait_for_terminal(execution.id, Duration::from_secs(10))
        .await?;

    // 4. Inspect the record
    println!("status:  {}", finished.status);
    println!("message: {:?}", finished.context.get("message"));
    for step in &finished.step_executions {
        println!(
            "  step {:<8} {:?} ({} ms)",
            step.step_id,
            step.status,
            step.duration_ms.unwrap_or(0)
        );
    }

    Ok(())
}
