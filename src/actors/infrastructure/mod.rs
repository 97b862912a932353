// ============================================================================
// Infrastructure Actors
// ============================================================================
//
// Background actors for system concerns:
// - Outbox relay (events -> notifications)
// - Dead letter queue
// - Bulk order import
// - Health monitoring
// - Coordination and supervision
//
// ============================================================================

mod coordinator;
mod dlq;
mod health_monitor;
mod import_worker;
mod outbox_relay;

pub use coordinator::{CoordinatorActor, GetHandles, Shutdown, SystemHandles};
pub use dlq::{AddToDlq, DlqActor, DlqStats, GetDeadLetters, GetDlqStats};
pub use health_monitor::{GetSystemHealth, HealthMonitorActor, SystemHealth, UpdateHealth};
pub use import_worker::{GetImportJob, ImportJob, ImportJobState, ImportWorker, RowError, SubmitImport};
pub use outbox_relay::{BatchReport, DrainOutbox, OutboxRelay, OutboxRelayConfig};
