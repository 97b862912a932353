use actix::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use crate::actors::core::HealthStatus;
use crate::services::Services;
use crate::store::OutboxStore;
use super::{
    DlqActor, GetSystemHealth, HealthMonitorActor, ImportWorker, OutboxRelay, OutboxRelayConfig,
    UpdateHealth,
};

// ============================================================================
// Coordinator Actor - Orchestrates all background actors
// ============================================================================
//
// Responsibilities:
// - Starts the child actors and hands their addresses to the HTTP layer
// - Pings the store periodically and reports it as the "database" component
// - Logs the overall system health
// - Coordinates graceful shutdown
//
// Actor Hierarchy:
//   CoordinatorActor
//   ├── HealthMonitorActor
//   ├── DlqActor
//   ├── OutboxRelay
//   └── ImportWorker
//
// ============================================================================

const STORE_PING_INTERVAL: Duration = Duration::from_secs(15);
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Addresses of the running child actors.
#[derive(Clone)]
pub struct SystemHandles {
    pub health_monitor: Addr<HealthMonitorActor>,
    pub dlq: Addr<DlqActor>,
    pub outbox_relay: Addr<OutboxRelay>,
    pub import_worker: Addr<ImportWorker>,
}

pub struct CoordinatorActor {
    services: Services,
    relay_config: OutboxRelayConfig,
    handles: Option<SystemHandles>,
}

impl CoordinatorActor {
    pub fn new(services: Services, relay_config: OutboxRelayConfig) -> Self {
        Self { services, relay_config, handles: None }
    }

    fn start_child_actors(&mut self, _ctx: &mut Context<Self>) {
        tracing::info!("Starting supervised child actors");
        let metrics = self.services.metrics.clone();

        let health_monitor = HealthMonitorActor::new(metrics.clone()).start();

        let dlq = DlqActor::new(self.services.stores.outbox.clone(), metrics.clone()).start();
        health_monitor.do_send(UpdateHealth {
            component: "dlq_actor".to_string(),
            status: HealthStatus::Healthy,
            details: Some("DLQ actor started".to_string()),
        });

        let outbox_relay = OutboxRelay::new(
            self.services.stores.outbox.clone(),
            self.services.notifications.clone(),
            dlq.clone(),
            metrics.clone(),
            self.relay_config.clone(),
        )
        .with_health_monitor(health_monitor.clone())
        .start();

        let import_worker = ImportWorker::new(self.services.siparisler.clone(), metrics)
            .with_health_monitor(health_monitor.clone())
            .start();

        self.handles = Some(SystemHandles { health_monitor, dlq, outbox_relay, import_worker });
        tracing::info!("✅ All supervised actors started successfully");
    }

    fn ping_store(&self, ctx: &mut Context<Self>) {
        let Some(handles) = self.handles.clone() else {
            return;
        };
        let outbox: Arc<dyn OutboxStore> = self.services.stores.outbox.clone();

        ctx.spawn(
            async move {
                let status = match outbox.ping().await {
                    Ok(()) => HealthStatus::Healthy,
                    Err(e) => HealthStatus::Unhealthy(e.to_string()),
                };
                handles.health_monitor.do_send(UpdateHealth {
                    component: "database".to_string(),
                    status,
                    details: None,
                });
            }
            .into_actor(self),
        );
    }
}

impl Actor for CoordinatorActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("🎯 CoordinatorActor started");
        self.start_child_actors(ctx);
        self.ping_store(ctx);

        ctx.run_interval(STORE_PING_INTERVAL, |act, ctx| act.ping_store(ctx));

        ctx.run_interval(HEALTH_LOG_INTERVAL, |act, _ctx| {
            if let Some(ref handles) = act.handles {
                let health_monitor = handles.health_monitor.clone();
                actix::spawn(async move {
                    match health_monitor.send(GetSystemHealth).await {
                        Ok(health) => match health.overall_status {
                            HealthStatus::Healthy => {
                                tracing::debug!("System health check: Healthy");
                            }
                            HealthStatus::Degraded(ref msg) => {
                                tracing::warn!("System health check: Degraded - {}", msg);
                            }
                            HealthStatus::Unhealthy(ref msg) => {
                                tracing::error!("System health check: Unhealthy - {}", msg);
                            }
                        },
                        Err(e) => {
                            tracing::error!("Failed to get system health: {}", e);
                        }
                    }
                });
            }
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        tracing::info!("🛑 CoordinatorActor stopping - initiating graceful shutdown");
        Running::Stop
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        tracing::info!("🛑 CoordinatorActor stopped");
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "Option<SystemHandles>")]
pub struct GetHandles;

impl Handler<GetHandles> for CoordinatorActor {
    type Result = Option<SystemHandles>;

    fn handle(&mut self, _msg: GetHandles, _: &mut Self::Context) -> Self::Result {
        self.handles.clone()
    }
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Shutdown;

impl Handler<Shutdown> for CoordinatorActor {
    type Result = ();

    fn handle(&mut self, _msg: Shutdown, ctx: &mut Self::Context) {
        tracing::info!("Received shutdown signal");

        if let Some(ref handles) = self.handles {
            handles.outbox_relay.do_send(StopActor);
            handles.import_worker.do_send(StopActor);
            handles.dlq.do_send(StopActor);
            handles.health_monitor.do_send(StopActor);
        }

        ctx.stop();
    }
}

/// Message to gracefully stop an actor
#[derive(Message)]
#[rtype(result = "()")]
struct StopActor;

impl Handler<StopActor> for OutboxRelay {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("OutboxRelay received stop signal");
        ctx.stop();
    }
}

impl Handler<StopActor> for ImportWorker {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("ImportWorker received stop signal");
        ctx.stop();
    }
}

impl Handler<StopActor> for HealthMonitorActor {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("HealthMonitorActor received stop signal");
        ctx.stop();
    }
}

impl Handler<StopActor> for DlqActor {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("DlqActor received stop signal");
        ctx.stop();
    }
}
