//! Event Stream Example - observing executions through the bus
//!
//! Subscribes to the engine's broadcast bus and prints every lifecycle event
//! while a workflow with a deliberately failing (but tolerated) step runs.
//!
//! Run with: cargo run -p flowrun-agents --example event_stream

use std::sync::Arc;
use std::time::Duration;

use flowrun_agents::{DelayAgent, EchoAgent, FailAgent};
use flowrun_engine::prelude::*;
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    println!("=== Event Stream (flowrun) ===\n");

    let engine = Engine::in_memory();
    engine.register_agent(Arc::new(DelayAgent));
    engine.register_agent(Arc::new(FailAgent));
    engine.register_agent(Arc::new(EchoAgent));

    // Print bus events as they arrive
    let mut events = engine.subscribe().expect("in-memory engine owns a broadcast bus");
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!(
                "[bus] {:<20} step={:?}",
                event.event_type.to_string(),
                event.step_id.as_deref().unwrap_or("-")
            );
        }
    });

    engine
        .create_workflow(WorkflowDefinition::new(
            "noisy",
            "Noisy Pipeline",
            vec![
                WorkflowStep::new("warm-up", "delay").with_input(json!({ "duration_ms": 100 })),
                WorkflowStep::new("wobble", "fail")
                    .with_input(json!({ "message": "transient wobble" }))
                    .continue_on_error(),
                WorkflowStep::new("finish", "echo").with_input(json!({ "done": true })),
            ],
        ))
        .await?;

    let execution = engine.start_workflow("noisy", None, None).await?;
    let finished = engine
        .wait_for_terminal(execution.id, Duration::from_secs(10))
        .await?;

    // Give the printer a moment to drain the final events
    tokio::time::sleep(Duration::from_millis(100)).await;
    printer.abort();

    println!("\nfinal status: {}", finished.status);
    println!(
        "steps: {} completed, {} failed",
        finished.metrics.completed_steps, finished.metrics.failed_steps
    );

    for event in engine.execution_logs(execution.id).await? {
        println!(
            "[log] {:?} step={:?}",
            event.event_type,
            event.step_id.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
