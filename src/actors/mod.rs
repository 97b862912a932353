// ============================================================================
// Actors Module
// ============================================================================
//
// Actor-based infrastructure for background work.
//
// Structure:
// - core/           - Health abstractions (HealthStatus, HealthCheckable)
// - infrastructure/ - Concrete actors (Outbox relay, DLQ, Import, Health, Coordinator)
//
// Note: Domain logic (Firma, Ihale, Siparis, ...) goes through services and
//       CommandHandlers, NOT actors. Actors are reserved for infrastructure.
//
// ============================================================================

mod core;
mod infrastructure;

pub use self::core::{ComponentHealth, HealthCheckable, HealthStatus};
pub use self::infrastructure::{
    AddToDlq, BatchReport, CoordinatorActor, DlqActor, DlqStats, DrainOutbox, GetDeadLetters,
    GetDlqStats, GetHandles, GetImportJob, GetSystemHealth, HealthMonitorActor, ImportJob,
    ImportJobState, ImportWorker, OutboxRelay, OutboxRelayConfig, RowError, Shutdown,
    SubmitImport, SystemHandles, SystemHealth, UpdateHealth,
};
