//! Engine health and aggregate metrics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot returned by `Engine::health_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub workflows: usize,
    pub executions: usize,
    pub running_executions: usize,
    pub registered_agents: usize,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate execution counters returned by `Engine::metrics`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineMetrics {
    pub executions_total: usize,
    pub executions_running: usize,
    pub executions_paused: usize,
    pub executions_completed: usize,
    pub executions_failed: usize,
    pub executions_cancelled: usize,

    /// Mean duration over terminal executions, if any have finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_duration_ms: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_serialize_without_avg() {
        let metrics = EngineMetrics::default();
        let json = serde_json::to_string(&metrics).unwrap();
        assert!(!json.contains("avg_duration_ms"));
    }
}
