//! Engine configuration

use std::time::Duration;

/// Configuration for the orchestration engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Buffer size of the default broadcast event bus
    pub bus_buffer: usize,

    /// How often `wait_for_terminal` re-reads the execution record
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bus_buffer: 256,
            poll_interval: Duration::from_millis(20),
        }
    }
}
