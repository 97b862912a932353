use actix::prelude::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

use crate::actors::core::{ComponentHealth, HealthCheckable, HealthStatus};
use crate::domain::user::Caller;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::Metrics;
use crate::services::siparis::{ImportRow, SiparisService};
use super::health_monitor::{HealthMonitorActor, UpdateHealth};

// ============================================================================
// Import Worker Actor - bulk order ingestion
// ============================================================================
//
// Owns a FIFO of import jobs and drains it one job at a time. Each row is
// created through SiparisService as the caller who submitted the job, so
// the same authorization and validation apply as for a single order.
//
// Queued -> Running -> Completed { succeeded, failed }
//
// A failing row is recorded with its index and message; the job moves on.
// Jobs live in memory only.
//
// ============================================================================

pub const MAX_ROWS_PER_JOB: usize = 1000;
const MAX_FINISHED_JOBS: usize = 500;
const BACKLOG_DEGRADED_AT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state")]
pub enum ImportJobState {
    Queued,
    Running,
    Completed { succeeded: usize, failed: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportJob {
    pub id: Uuid,
    pub submitted_by: Uuid,
    pub firma_id: Option<Uuid>,
    pub row_count: usize,
    pub state: ImportJobState,
    pub errors: Vec<RowError>,
    pub created_order_ids: Vec<Uuid>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    caller: Caller,
    #[serde(skip)]
    rows: Vec<ImportRow>,
}

impl ImportJob {
    fn visible_to(&self, caller: &Caller) -> bool {
        caller.is_admin() || caller.user_id == self.submitted_by || (self.firma_id.is_some() && caller.firma_id == self.firma_id)
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "Result<ImportJob, ServiceError>")]
pub struct SubmitImport {
    pub caller: Caller,
    pub rows: Vec<ImportRow>,
}

#[derive(Message)]
#[rtype(result = "Result<ImportJob, ServiceError>")]
pub struct GetImportJob {
    pub caller: Caller,
    pub id: Uuid,
}

#[derive(Message)]
#[rtype(result = "()")]
struct ProcessNext;

struct JobOutcome {
    created: Vec<Uuid>,
    errors: Vec<RowError>,
}

// ============================================================================
// Import Worker Actor
// ============================================================================

pub struct ImportWorker {
    siparisler: SiparisService,
    metrics: Arc<Metrics>,
    health: Option<Addr<HealthMonitorActor>>,
    queue: VecDeque<Uuid>,
    jobs: HashMap<Uuid, ImportJob>,
    finished: VecDeque<Uuid>,
    busy: bool,
}

impl ImportWorker {
    pub fn new(siparisler: SiparisService, metrics: Arc<Metrics>) -> Self {
        Self {
            siparisler,
            metrics,
            health: None,
            queue: VecDeque::new(),
            jobs: HashMap::new(),
            finished: VecDeque::new(),
            busy: false,
        }
    }

    pub fn with_health_monitor(mut self, health: Addr<HealthMonitorActor>) -> Self {
        self.health = Some(health);
        self
    }

    fn update_queue_depth(&self) {
        self.metrics.import_queue_depth.set(self.queue.len() as i64);
    }

    fn report_health(&self) {
        if let Some(ref health) = self.health {
            health.do_send(UpdateHealth::from(self.check_health()));
        }
    }

    fn complete(&mut self, id: Uuid, outcome: JobOutcome) {
        let succeeded = outcome.created.len();
        let failed = outcome.errors.len();

        if let Some(job) = self.jobs.get_mut(&id) {
            job.state = ImportJobState::Completed { succeeded, failed };
            job.errors = outcome.errors;
            job.created_order_ids = outcome.created;
            job.finished_at = Some(Utc::now());
            job.rows = Vec::new();
        }

        self.metrics.record_import_job("completed");
        self.metrics.record_import_rows(succeeded as u64, failed as u64);
        tracing::info!(job_id = %id, succeeded, failed, "✅ Import job completed");

        self.finished.push_back(id);
        while self.finished.len() > MAX_FINISHED_JOBS {
            if let Some(oldest) = self.finished.pop_front() {
                self.jobs.remove(&oldest);
            }
        }
    }
}

impl HealthCheckable for ImportWorker {
    fn check_health(&self) -> ComponentHealth {
        let status = if self.queue.len() >= BACKLOG_DEGRADED_AT {
            HealthStatus::Degraded(format!("{} import jobs waiting", self.queue.len()))
        } else {
            HealthStatus::Healthy
        };
        ComponentHealth::new(self.component_name(), status)
            .with_details(format!("queued={} busy={}", self.queue.len(), self.busy))
    }

    fn component_name(&self) -> &str {
        "import_worker"
    }
}

impl Actor for ImportWorker {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("ImportWorker started");
        self.report_health();
    }
}

// ============================================================================
// Handlers
// ============================================================================

impl Handler<SubmitImport> for ImportWorker {
    type Result = Result<ImportJob, ServiceError>;

    fn handle(&mut self, msg: SubmitImport, ctx: &mut Self::Context) -> Self::Result {
        if msg.caller.firma_id.is_none() {
            return Err(ServiceError::forbidden("Orders can only be imported by a firm account"));
        }
        if msg.rows.is_empty() {
            return Err(ServiceError::Validation("Import contains no rows".into()));
        }
        if msg.rows.len() > MAX_ROWS_PER_JOB {
            return Err(ServiceError::Validation(format!(
                "Import has {} rows, at most {} are allowed",
                msg.rows.len(),
                MAX_ROWS_PER_JOB
            )));
        }

        let job = ImportJob {
            id: Uuid::now_v7(),
            submitted_by: msg.caller.user_id,
            firma_id: msg.caller.firma_id,
            row_count: msg.rows.len(),
            state: ImportJobState::Queued,
            errors: Vec::new(),
            created_order_ids: Vec::new(),
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
            caller: msg.caller,
            rows: msg.rows,
        };

        tracing::info!(job_id = %job.id, rows = job.row_count, user_id = %job.submitted_by, "📥 Import job queued");
        self.metrics.record_import_job("queued");

        self.queue.push_back(job.id);
        self.jobs.insert(job.id, job.clone());
        self.update_queue_depth();
        self.report_health();
        ctx.notify(ProcessNext);

        Ok(job)
    }
}

impl Handler<GetImportJob> for ImportWorker {
    type Result = Result<ImportJob, ServiceError>;

    fn handle(&mut self, msg: GetImportJob, _: &mut Self::Context) -> Self::Result {
        self.jobs
            .get(&msg.id)
            .filter(|job| job.visible_to(&msg.caller))
            .cloned()
            .ok_or_else(|| ServiceError::not_found("Import job", msg.id))
    }
}

impl Handler<ProcessNext> for ImportWorker {
    type Result = ();

    fn handle(&mut self, _: ProcessNext, ctx: &mut Self::Context) {
        if self.busy {
            return;
        }
        let Some(id) = self.queue.pop_front() else {
            return;
        };
        self.update_queue_depth();

        let Some(job) = self.jobs.get_mut(&id) else {
            ctx.notify(ProcessNext);
            return;
        };
        job.state = ImportJobState::Running;
        job.started_at = Some(Utc::now());
        let caller = job.caller;
        let rows = std::mem::take(&mut job.rows);

        tracing::info!(job_id = %id, rows = rows.len(), "⚙️ Import job running");
        self.busy = true;

        let siparisler = self.siparisler.clone();
        let work = async move { run_rows(&siparisler, &caller, rows).await };

        ctx.spawn(work.into_actor(self).map(move |outcome, act, ctx| {
            act.complete(id, outcome);
            act.busy = false;
            act.report_health();
            ctx.notify(ProcessNext);
        }));
    }
}

async fn run_rows(siparisler: &SiparisService, caller: &Caller, rows: Vec<ImportRow>) -> JobOutcome {
    let mut outcome = JobOutcome { created: Vec::new(), errors: Vec::new() };

    for (index, row) in rows.into_iter().enumerate() {
        let result: ServiceResult<_> = siparisler.import_row(caller, row).await;
        match result {
            Ok(siparis) => outcome.created.push(siparis.meta.id),
            Err(e) => {
                tracing::debug!(row = index, error = %e, "Import row rejected");
                outcome.errors.push(RowError { row: index, message: e.to_string() });
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::firma::FirmaType;
    use crate::domain::siparis::SiparisKalemi;
    use crate::models::{Currency, Unit};
    use crate::services::tests::{admin, approved_firma_of_type, services};
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn row(tax_number: &str, quantity: i64) -> ImportRow {
        ImportRow {
            supplier_firma_id: None,
            supplier_tax_number: Some(tax_number.into()),
            items: vec![SiparisKalemi {
                malzeme_id: None,
                description: "A4 kagit".into(),
                quantity: Decimal::new(quantity, 0),
                unit: Unit::Package,
                unit_price: Decimal::new(120, 0),
            }],
            currency: Currency::TRY,
            delivery_address: None,
            requested_delivery_date: None,
            note: None,
        }
    }

    async fn wait_until_completed(worker: &Addr<ImportWorker>, caller: Caller, id: Uuid) -> ImportJob {
        for _ in 0..100 {
            let job = worker.send(GetImportJob { caller, id }).await.unwrap().unwrap();
            if matches!(job.state, ImportJobState::Completed { .. }) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("import job {} did not complete", id);
    }

    #[actix::test]
    async fn test_job_runs_rows_and_records_failures() {
        let services = services();
        let (_, customer) =
            approved_firma_of_type(&services, "1111111111", "a@musteri.com", FirmaType::Customer).await;
        approved_firma_of_type(&services, "2222222222", "a@tedarik.com", FirmaType::Supplier).await;
        let caller = customer.as_caller();

        let worker = ImportWorker::new(services.siparisler.clone(), services.metrics.clone()).start();
        let rows = vec![row("2222222222", 5), row("9999999999", 1), row("2222222222", 0), row("2222222222", 2)];
        let job = worker.send(SubmitImport { caller, rows }).await.unwrap().unwrap();
        assert_eq!(job.state, ImportJobState::Queued);
        assert_eq!(job.row_count, 4);

        let job = wait_until_completed(&worker, caller, job.id).await;
        assert_eq!(job.state, ImportJobState::Completed { succeeded: 2, failed: 2 });
        let failed_rows: Vec<usize> = job.errors.iter().map(|e| e.row).collect();
        assert_eq!(failed_rows, vec![1, 2]);
        assert_eq!(job.created_order_ids.len(), 2);
        assert!(job.started_at.is_some() && job.finished_at.is_some());

        let orders = services
            .siparisler
            .list(&caller, crate::services::siparis::OrderSide::Customer, None, None, None)
            .await
            .unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(services.metrics.import_queue_depth.get(), 0);
    }

    #[actix::test]
    async fn test_jobs_are_private_to_the_submitting_firm() {
        let services = services();
        let (_, customer) =
            approved_firma_of_type(&services, "1111111111", "a@musteri.com", FirmaType::Customer).await;
        let (_, other) = approved_firma_of_type(&services, "2222222222", "a@baska.com", FirmaType::Both).await;

        let worker = ImportWorker::new(services.siparisler.clone(), services.metrics.clone()).start();
        let job = worker
            .send(SubmitImport { caller: customer.as_caller(), rows: vec![row("2222222222", 1)] })
            .await
            .unwrap()
            .unwrap();

        let foreign = worker.send(GetImportJob { caller: other.as_caller(), id: job.id }).await.unwrap();
        assert!(matches!(foreign, Err(ServiceError::NotFound(_))));
        assert!(worker.send(GetImportJob { caller: admin(), id: job.id }).await.unwrap().is_ok());
    }

    #[actix::test]
    async fn test_submission_is_validated() {
        let services = services();
        let worker = ImportWorker::new(services.siparisler.clone(), services.metrics.clone()).start();

        let no_firm = worker.send(SubmitImport { caller: admin(), rows: vec![row("1", 1)] }).await.unwrap();
        assert!(matches!(no_firm, Err(ServiceError::Forbidden(_))));

        let (_, customer) =
            approved_firma_of_type(&services, "1111111111", "a@musteri.com", FirmaType::Customer).await;
        let empty = worker.send(SubmitImport { caller: customer.as_caller(), rows: vec![] }).await.unwrap();
        assert!(matches!(empty, Err(ServiceError::Validation(_))));
    }
}
