use actix::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use crate::actors::core::{ComponentHealth, HealthCheckable, HealthStatus};
use crate::metrics::Metrics;
use crate::services::{notifications_for, NotificationService};
use crate::store::{OutboxMessage, OutboxStore, StoreError};
use crate::utils::{retry_transient, Backoff};
use super::dlq::{AddToDlq, DlqActor};
use super::health_monitor::{HealthMonitorActor, UpdateHealth};

// ============================================================================
// Outbox Relay Actor - Polls outbox_messages and turns them into notifications
// ============================================================================
//
// Each poll:
// 1. Fetches a batch of unprocessed messages in creation order
// 2. Derives the notifications of each message and inserts them
//    (retrying transient store failures with backoff)
// 3. Marks the message processed
//
// Failures:
// - Payload that cannot be decoded  -> straight to the DLQ
// - Store failure after retries     -> attempt counter + 1; DLQ once the
//                                      counter reaches max_attempts
//
// Only one batch runs at a time; a tick that finds a batch in flight is skipped.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct OutboxRelayConfig {
    pub poll_interval: Duration,
    pub batch_size: i64,
    pub max_attempts: i32,
}

impl Default for OutboxRelayConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_millis(2000), batch_size: 100, max_attempts: 5 }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub fetched: usize,
    pub dispatched: usize,
    pub notifications: u64,
    pub failed: usize,
    pub dead_lettered: usize,
}

#[derive(Debug, thiserror::Error)]
enum RelayFailure {
    #[error("Undecodable payload: {0}")]
    Undecodable(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Run one poll: fetch, dispatch, record failures.
#[derive(Message)]
#[rtype(result = "Result<BatchReport, StoreError>")]
pub struct DrainOutbox;

pub struct OutboxRelay {
    outbox: Arc<dyn OutboxStore>,
    notifications: NotificationService,
    dlq: Addr<DlqActor>,
    health: Option<Addr<HealthMonitorActor>>,
    metrics: Arc<Metrics>,
    config: OutboxRelayConfig,
    in_flight: bool,
    consecutive_errors: u32,
    last_report: Option<BatchReport>,
}

impl OutboxRelay {
    pub fn new(
        outbox: Arc<dyn OutboxStore>,
        notifications: NotificationService,
        dlq: Addr<DlqActor>,
        metrics: Arc<Metrics>,
        config: OutboxRelayConfig,
    ) -> Self {
        Self {
            outbox,
            notifications,
            dlq,
            health: None,
            metrics,
            config,
            in_flight: false,
            consecutive_errors: 0,
            last_report: None,
        }
    }

    pub fn with_health_monitor(mut self, health: Addr<HealthMonitorActor>) -> Self {
        self.health = Some(health);
        self
    }

    fn drain(&self) -> impl std::future::Future<Output = Result<BatchReport, StoreError>> + 'static {
        drain_batch(
            self.outbox.clone(),
            self.notifications.clone(),
            self.dlq.clone(),
            self.metrics.clone(),
            self.config.batch_size,
            self.config.max_attempts,
        )
    }

    fn finish_batch(&mut self, result: &Result<BatchReport, StoreError>) {
        self.in_flight = false;
        match result {
            Ok(report) => {
                self.consecutive_errors = 0;
                if report.fetched > 0 {
                    tracing::info!(
                        fetched = report.fetched,
                        dispatched = report.dispatched,
                        notifications = report.notifications,
                        failed = report.failed,
                        dead_lettered = report.dead_lettered,
                        "📬 Outbox batch processed"
                    );
                }
                self.last_report = Some(report.clone());
            }
            Err(e) => {
                self.consecutive_errors += 1;
                tracing::error!(error = %e, consecutive_errors = self.consecutive_errors, "Outbox poll failed");
            }
        }

        if let Some(ref health) = self.health {
            health.do_send(UpdateHealth::from(self.check_health()));
        }
    }
}

impl HealthCheckable for OutboxRelay {
    fn check_health(&self) -> ComponentHealth {
        let status = match (self.consecutive_errors, &self.last_report) {
            (n, _) if n >= 3 => HealthStatus::Unhealthy(format!("{} consecutive poll failures", n)),
            (n, _) if n > 0 => HealthStatus::Degraded("Last outbox poll failed".to_string()),
            (_, Some(report)) if report.failed > 0 => {
                HealthStatus::Degraded(format!("{} messages failed in the last batch", report.failed))
            }
            _ => HealthStatus::Healthy,
        };
        let details = format!("pending={}", self.metrics.outbox_pending.get());
        ComponentHealth::new(self.component_name(), status).with_details(details)
    }

    fn component_name(&self) -> &str {
        "outbox_relay"
    }
}

impl Actor for OutboxRelay {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            batch_size = self.config.batch_size,
            max_attempts = self.config.max_attempts,
            "🔄 OutboxRelay started"
        );

        ctx.run_interval(self.config.poll_interval, |act, ctx| {
            if act.in_flight {
                tracing::debug!("Previous outbox batch still running, skipping tick");
                return;
            }
            act.in_flight = true;
            ctx.spawn(act.drain().into_actor(act).map(|result, act, _| act.finish_batch(&result)));
        });
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        tracing::info!("🛑 OutboxRelay stopped");
    }
}

impl Handler<DrainOutbox> for OutboxRelay {
    type Result = ResponseActFuture<Self, Result<BatchReport, StoreError>>;

    fn handle(&mut self, _msg: DrainOutbox, _: &mut Self::Context) -> Self::Result {
        if self.in_flight {
            return Box::pin(actix::fut::ready(Ok(BatchReport::default())));
        }
        self.in_flight = true;
        Box::pin(self.drain().into_actor(self).map(|result, act, _| {
            act.finish_batch(&result);
            result
        }))
    }
}

// ============================================================================
// Batch processing
// ============================================================================

async fn drain_batch(
    outbox: Arc<dyn OutboxStore>,
    notifications: NotificationService,
    dlq: Addr<DlqActor>,
    metrics: Arc<Metrics>,
    batch_size: i64,
    max_attempts: i32,
) -> Result<BatchReport, StoreError> {
    let messages = outbox.fetch_pending(batch_size).await?;
    let mut report = BatchReport { fetched: messages.len(), ..BatchReport::default() };

    for mut message in messages {
        match dispatch(&outbox, &notifications, &metrics, &message).await {
            Ok(created) => {
                report.dispatched += 1;
                report.notifications += created;
                metrics.record_dispatch(&message.event_type, created);
            }
            Err(RelayFailure::Undecodable(e)) => {
                metrics.record_dispatch_failure(&message.event_type, "undecodable");
                dead_letter(&dlq, message, e.to_string()).await?;
                report.dead_lettered += 1;
            }
            Err(RelayFailure::Store(e)) => {
                metrics.record_dispatch_failure(&message.event_type, "store");
                let error = e.to_string();
                message.attempts = outbox.record_failure(message.id, &error).await?;

                if message.attempts >= max_attempts {
                    dead_letter(&dlq, message, error).await?;
                    report.dead_lettered += 1;
                } else {
                    tracing::warn!(
                        event_id = %message.id,
                        event_type = %message.event_type,
                        attempts = message.attempts,
                        error = %error,
                        "Outbox message failed, will retry on next poll"
                    );
                    report.failed += 1;
                }
            }
        }
    }

    metrics.outbox_pending.set(outbox.pending_count().await?);
    Ok(report)
}

/// Insert the notifications of one message and mark it processed.
async fn dispatch(
    outbox: &Arc<dyn OutboxStore>,
    notifications: &NotificationService,
    metrics: &Arc<Metrics>,
    message: &OutboxMessage,
) -> Result<u64, RelayFailure> {
    let batch = notifications_for(message)?;

    let created = retry_transient(&Backoff::relay(), "notification_insert", |attempt| {
        if attempt > 1 {
            metrics.record_retry_attempt("notification_insert", attempt);
        }
        let notifications = notifications.clone();
        let batch = batch.clone();
        async move { notifications.deliver(&batch).await }
    })
    .await?;

    outbox.mark_processed(message.id).await?;

    tracing::debug!(
        event_id = %message.id,
        event_type = %message.event_type,
        notifications = created,
        "✅ Outbox message dispatched"
    );
    Ok(created)
}

async fn dead_letter(dlq: &Addr<DlqActor>, message: OutboxMessage, error_message: String) -> Result<(), StoreError> {
    dlq.send(AddToDlq { message, error_message })
        .await
        .map_err(|e| StoreError::Backend(format!("DLQ actor unavailable: {}", e)))?
}
