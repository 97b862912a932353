use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Health Check Abstractions
// ============================================================================
//
// Background actors report their state to the health monitor, which folds
// them into the answer served on /health.
//
// ============================================================================

/// Health status of a component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }

    /// Gauge value: 0 = unhealthy, 1 = degraded, 2 = healthy
    pub fn gauge_value(&self) -> i64 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded(_) => 1,
            HealthStatus::Unhealthy(_) => 0,
        }
    }
}

/// Health information for a component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
    pub details: Option<String>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            last_check: Utc::now(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Actors that can describe their own health
pub trait HealthCheckable {
    fn check_health(&self) -> ComponentHealth;

    fn component_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_values() {
        assert_eq!(HealthStatus::Healthy.gauge_value(), 2);
        assert_eq!(HealthStatus::Degraded("slow".into()).gauge_value(), 1);
        assert_eq!(HealthStatus::Unhealthy("down".into()).gauge_value(), 0);
    }

    #[test]
    fn test_serialized_shape() {
        let body = serde_json::to_value(HealthStatus::Degraded("queue backlog".into())).unwrap();
        assert_eq!(body["status"], "Degraded");
        assert_eq!(body["reason"], "queue backlog");

        let health = ComponentHealth::new("database", HealthStatus::Healthy).with_details("ping ok");
        assert_eq!(health.details.as_deref(), Some("ping ok"));
    }
}
