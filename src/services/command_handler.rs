use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::domain::core::{Aggregate, AggregateMeta, EventEnvelope};
use crate::domain::user::Caller;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::Metrics;
use crate::store::{AggregateStore, ListQuery};

// ============================================================================
// Generic Command Handler
// ============================================================================
//
// Orchestrates: Command → Aggregate → Events → State row + Outbox
//
// Every successful command bumps the version by one; the events it produced
// share that version as their sequence number.
//
// ============================================================================

pub struct CommandHandler<A: Aggregate> {
    store: Arc<dyn AggregateStore<A>>,
    metrics: Arc<Metrics>,
}

impl<A: Aggregate> Clone for CommandHandler<A> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), metrics: self.metrics.clone() }
    }
}

impl<A> CommandHandler<A>
where
    A: Aggregate,
    ServiceError: From<A::Error>,
{
    pub fn new(store: Arc<dyn AggregateStore<A>>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Load a live aggregate; deleted records are reported as missing.
    pub async fn load(&self, id: Uuid) -> ServiceResult<A> {
        match self.store.load(id).await? {
            Some(aggregate) if !aggregate.is_deleted() => Ok(aggregate),
            _ => Err(ServiceError::not_found(A::AGGREGATE_TYPE, id)),
        }
    }

    pub async fn list(&self, query: &ListQuery) -> ServiceResult<Vec<A>> {
        Ok(self.store.list(query).await?)
    }

    pub async fn find_by_unique_key(&self, key: &str) -> ServiceResult<Option<A>> {
        Ok(self.store.find_by_unique_key(key).await?)
    }

    /// Handle a creation command for a new aggregate with the given id.
    pub async fn create(&self, caller: Option<&Caller>, id: Uuid, command: A::Command) -> ServiceResult<A> {
        let started = Instant::now();
        let name = A::command_name(&command);

        let result = self.run_creation(caller, id, command).await;
        self.record(name, &result, started);
        result
    }

    /// Handle a command against an already loaded aggregate.
    pub async fn execute(&self, caller: Option<&Caller>, aggregate: A, command: A::Command) -> ServiceResult<A> {
        let started = Instant::now();
        let name = A::command_name(&command);

        let result = self.run_command(caller, aggregate, command).await;
        self.record(name, &result, started);
        result
    }

    async fn run_creation(&self, caller: Option<&Caller>, id: Uuid, command: A::Command) -> ServiceResult<A> {
        let events = A::handle_creation(&command)?;

        let meta = AggregateMeta::new(id, caller.map(|c| c.user_id), Utc::now());
        let mut aggregate = A::load_from_events(meta, &events)?;
        aggregate.meta_mut().version = 1;

        let envelopes = Self::wrap(&aggregate, caller, events);
        self.store.save(&aggregate, 0, &envelopes).await?;
        self.after_save(&aggregate, &envelopes);

        Ok(aggregate)
    }

    async fn run_command(&self, caller: Option<&Caller>, aggregate: A, command: A::Command) -> ServiceResult<A> {
        let expected_version = aggregate.version();
        let events = aggregate.handle_command(&command)?;

        if events.is_empty() {
            tracing::debug!(
                aggregate_type = A::AGGREGATE_TYPE,
                aggregate_id = %aggregate.aggregate_id(),
                command = A::command_name(&command),
                "Command produced no events, nothing to save"
            );
            return Ok(aggregate);
        }

        let mut next = aggregate;
        for event in &events {
            next.apply_event(event)?;
        }
        next.meta_mut().touch(caller.map(|c| c.user_id), Utc::now());
        next.meta_mut().version = expected_version + 1;

        let envelopes = Self::wrap(&next, caller, events);
        self.store.save(&next, expected_version, &envelopes).await?;
        self.after_save(&next, &envelopes);

        Ok(next)
    }

    fn wrap(aggregate: &A, caller: Option<&Caller>, events: Vec<A::Event>) -> Vec<EventEnvelope<A::Event>> {
        let correlation_id = Uuid::new_v4();
        let owner = aggregate.owner_firma_id();
        let parties = aggregate.parties();

        events
            .into_iter()
            .map(|event| {
                EventEnvelope::new(
                    aggregate.aggregate_id(),
                    A::AGGREGATE_TYPE,
                    aggregate.version(),
                    event,
                    correlation_id,
                )
                .with_caller(caller.map(|c| c.user_id), caller.and_then(|c| c.firma_id))
                .with_owner(owner, parties.clone())
            })
            .collect()
    }

    fn after_save(&self, aggregate: &A, envelopes: &[EventEnvelope<A::Event>]) {
        for envelope in envelopes {
            self.metrics.record_domain_event(&envelope.event_type);
        }

        tracing::info!(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %aggregate.aggregate_id(),
            version = aggregate.version(),
            status = aggregate.status_label(),
            event_count = envelopes.len(),
            "✅ Command applied"
        );
    }

    fn record(&self, command: &str, result: &ServiceResult<A>, started: Instant) {
        if let Err(e) = result {
            tracing::warn!(
                aggregate_type = A::AGGREGATE_TYPE,
                command = command,
                error = %e,
                "Command rejected"
            );
        }
        self.metrics.record_command(
            A::AGGREGATE_TYPE,
            command,
            result.is_ok(),
            started.elapsed().as_secs_f64(),
        );
    }
}
