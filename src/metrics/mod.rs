mod server;

use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry,
};

pub use server::metrics_handler;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Commands handled per aggregate (outcome, latency)
// - Domain events written to the outbox
// - Outbox relay throughput and failures
// - Dead letters
// - Import jobs and rows
// - Component health
//
// All metrics are registered with one Registry and scraped via /metrics
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Command Metrics
    pub commands_total: IntCounterVec,
    pub command_duration: HistogramVec,
    pub domain_events_total: IntCounterVec,

    // Outbox Relay Metrics
    pub outbox_dispatched: IntCounterVec,
    pub outbox_failed: IntCounterVec,
    pub outbox_pending: IntGauge,
    pub notifications_created: IntCounter,

    // Retry Metrics
    pub retry_attempts_total: IntCounterVec,

    // DLQ Metrics
    pub dlq_messages_total: IntCounter,
    pub dlq_messages_by_event_type: IntCounterVec,

    // Import Metrics
    pub import_jobs_total: IntCounterVec,
    pub import_rows_total: IntCounterVec,
    pub import_queue_depth: IntGauge,

    // Health
    pub component_health_status: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Command Metrics
        let commands_total = IntCounterVec::new(
            Opts::new("commands_total", "Commands handled per aggregate"),
            &["aggregate", "command", "outcome"],
        )?;
        registry.register(Box::new(commands_total.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new("command_duration_seconds", "Command handling duration including persistence")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["aggregate"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        let domain_events_total = IntCounterVec::new(
            Opts::new("domain_events_total", "Domain events written to the outbox"),
            &["event_type"],
        )?;
        registry.register(Box::new(domain_events_total.clone()))?;

        // Outbox Relay Metrics
        let outbox_dispatched = IntCounterVec::new(
            Opts::new("outbox_dispatched_total", "Outbox messages processed by the relay"),
            &["event_type"],
        )?;
        registry.register(Box::new(outbox_dispatched.clone()))?;

        let outbox_failed = IntCounterVec::new(
            Opts::new("outbox_failed_total", "Outbox messages that failed processing"),
            &["event_type", "reason"],
        )?;
        registry.register(Box::new(outbox_failed.clone()))?;

        let outbox_pending = IntGauge::new("outbox_pending", "Unprocessed outbox messages at the last poll")?;
        registry.register(Box::new(outbox_pending.clone()))?;

        let notifications_created = IntCounter::new("notifications_created_total", "Notifications created")?;
        registry.register(Box::new(notifications_created.clone()))?;

        // Retry Metrics
        let retry_attempts_total = IntCounterVec::new(
            Opts::new("retry_attempts_total", "Total retry attempts"),
            &["operation", "attempt"],
        )?;
        registry.register(Box::new(retry_attempts_total.clone()))?;

        // DLQ Metrics
        let dlq_messages_total = IntCounter::new(
            "dlq_messages_total",
            "Total messages moved to the dead letter queue",
        )?;
        registry.register(Box::new(dlq_messages_total.clone()))?;

        let dlq_messages_by_event_type = IntCounterVec::new(
            Opts::new("dlq_messages_by_event_type", "DLQ messages by event type"),
            &["event_type"],
        )?;
        registry.register(Box::new(dlq_messages_by_event_type.clone()))?;

        // Import Metrics
        let import_jobs_total = IntCounterVec::new(
            Opts::new("import_jobs_total", "Bulk order import jobs"),
            &["state"],
        )?;
        registry.register(Box::new(import_jobs_total.clone()))?;

        let import_rows_total = IntCounterVec::new(
            Opts::new("import_rows_total", "Bulk order import rows"),
            &["outcome"],
        )?;
        registry.register(Box::new(import_rows_total.clone()))?;

        let import_queue_depth = IntGauge::new("import_queue_depth", "Import jobs waiting in the queue")?;
        registry.register(Box::new(import_queue_depth.clone()))?;

        let component_health_status = IntGauge::new(
            "component_health_status",
            "Overall health (0=Unhealthy, 1=Degraded, 2=Healthy)",
        )?;
        registry.register(Box::new(component_health_status.clone()))?;

        Ok(Self {
            registry,
            commands_total,
            command_duration,
            domain_events_total,
            outbox_dispatched,
            outbox_failed,
            outbox_pending,
            notifications_created,
            retry_attempts_total,
            dlq_messages_total,
            dlq_messages_by_event_type,
            import_jobs_total,
            import_rows_total,
            import_queue_depth,
            component_health_status,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_command(&self, aggregate: &str, command: &str, success: bool, duration_secs: f64) {
        let outcome = if success { "ok" } else { "error" };
        self.commands_total.with_label_values(&[aggregate, command, outcome]).inc();
        self.command_duration.with_label_values(&[aggregate]).observe(duration_secs);
    }

    pub fn record_domain_event(&self, event_type: &str) {
        self.domain_events_total.with_label_values(&[event_type]).inc();
    }

    pub fn record_dispatch(&self, event_type: &str, notifications: u64) {
        self.outbox_dispatched.with_label_values(&[event_type]).inc();
        self.notifications_created.inc_by(notifications);
    }

    pub fn record_dispatch_failure(&self, event_type: &str, reason: &str) {
        self.outbox_failed.with_label_values(&[event_type, reason]).inc();
    }

    /// Helper to record retry attempt
    pub fn record_retry_attempt(&self, operation: &str, attempt: u32) {
        self.retry_attempts_total.with_label_values(&[operation, &attempt.to_string()]).inc();
    }

    /// Helper to record DLQ message
    pub fn record_dlq_message(&self, event_type: &str) {
        self.dlq_messages_total.inc();
        self.dlq_messages_by_event_type.with_label_values(&[event_type]).inc();
    }

    pub fn record_import_job(&self, state: &str) {
        self.import_jobs_total.with_label_values(&[state]).inc();
    }

    pub fn record_import_rows(&self, succeeded: u64, failed: u64) {
        self.import_rows_total.with_label_values(&["succeeded"]).inc_by(succeeded);
        self.import_rows_total.with_label_values(&["failed"]).inc_by(failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str) -> f64 {
        let gathered = metrics.registry().gather();
        let family = gathered.iter().find(|m| m.name() == name).unwrap();
        family.metric.iter().map(|m| m.counter.value.unwrap_or(0.0)).sum()
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.outbox_pending.set(0);
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_command() {
        let metrics = Metrics::new().unwrap();
        metrics.record_command("Siparis", "confirm", true, 0.01);
        metrics.record_command("Siparis", "confirm", false, 0.02);
        metrics.record_command("Ihale", "publish", true, 0.01);

        assert_eq!(counter_value(&metrics, "commands_total"), 3.0);
    }

    #[test]
    fn test_record_dispatch() {
        let metrics = Metrics::new().unwrap();
        metrics.record_dispatch("TeklifAccepted", 1);
        metrics.record_dispatch("IhaleCancelled", 3);

        assert_eq!(counter_value(&metrics, "outbox_dispatched_total"), 2.0);
        assert_eq!(counter_value(&metrics, "notifications_created_total"), 4.0);
    }

    #[test]
    fn test_record_dlq_message() {
        let metrics = Metrics::new().unwrap();
        metrics.record_dlq_message("SiparisCreated");
        metrics.record_dlq_message("SiparisShipped");

        assert_eq!(counter_value(&metrics, "dlq_messages_total"), 2.0);
    }

    #[test]
    fn test_record_import_rows() {
        let metrics = Metrics::new().unwrap();
        metrics.record_import_rows(8, 2);
        assert_eq!(counter_value(&metrics, "import_rows_total"), 10.0);
    }
}
