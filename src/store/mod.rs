use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::core::{serialize_event, Aggregate, DomainEvent, EventEnvelope};
use crate::domain::firma::Firma;
use crate::domain::ihale::Ihale;
use crate::domain::malzeme::Malzeme;
use crate::domain::notification::Notification;
use crate::domain::siparis::Siparis;
use crate::domain::user::User;
use crate::utils::IsTransient;

pub mod memory;
pub mod postgres;

pub use memory::{MemoryAggregateStore, MemoryBackend};
pub use postgres::{PostgresAggregateStore, PostgresBackend};

// ============================================================================
// Store Layer - state rows, unique keys and the transactional outbox
// ============================================================================
//
// Saving an aggregate writes, in one transaction:
// 1. The state row (insert at version 0, otherwise update guarded by version)
// 2. Its unique keys (replacing the previous set)
// 3. One outbox row per event
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{aggregate_type} {id} not found")]
    NotFound { aggregate_type: &'static str, id: Uuid },

    #[error("Concurrency conflict on {aggregate_type} {id}: expected version {expected}")]
    Concurrency { aggregate_type: &'static str, id: Uuid, expected: i64 },

    #[error("Unique key already taken: {0}")]
    UniqueViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl IsTransient for StoreError {
    /// Only backend failures (connection loss, timeouts) are worth retrying.
    fn is_transient(&self) -> bool {
        matches!(self, StoreError::Backend(_))
    }
}

/// Filters for listing aggregates of one type.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub owner_firma_id: Option<Uuid>,
    /// Matches rows where the firm is any of the parties
    pub party_firma_id: Option<Uuid>,
    pub statuses: Vec<String>,
    pub include_deleted: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            owner_firma_id: None,
            party_firma_id: None,
            statuses: Vec::new(),
            include_deleted: false,
            limit: 50,
            offset: 0,
        }
    }
}

impl ListQuery {
    pub fn owned_by(firma_id: Uuid) -> Self {
        Self { owner_firma_id: Some(firma_id), ..Self::default() }
    }

    pub fn involving(firma_id: Uuid) -> Self {
        Self { party_firma_id: Some(firma_id), ..Self::default() }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.statuses.push(status.to_string());
        self
    }

    pub fn page(mut self, limit: Option<i64>, offset: Option<i64>) -> Self {
        self.limit = limit.unwrap_or(self.limit).clamp(1, 500);
        self.offset = offset.unwrap_or(self.offset).max(0);
        self
    }

    /// In-memory equivalent of the SQL filter.
    pub fn matches(
        &self,
        status: &str,
        owner_firma_id: Option<Uuid>,
        parties: &[Uuid],
        is_deleted: bool,
    ) -> bool {
        if is_deleted && !self.include_deleted {
            return false;
        }
        if let Some(owner) = self.owner_firma_id {
            if owner_firma_id != Some(owner) {
                return false;
            }
        }
        if let Some(party) = self.party_firma_id {
            if !parties.contains(&party) {
                return false;
            }
        }
        self.statuses.is_empty() || self.statuses.iter().any(|s| s == status)
    }
}

// ============================================================================
// Outbox
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub owner_firma_id: Option<Uuid>,
    pub parties: Vec<Uuid>,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub actor_user_id: Option<Uuid>,
    pub actor_firma_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub attempts: i32,
    pub last_error: Option<String>,
}

impl OutboxMessage {
    pub fn from_envelope<E: DomainEvent>(envelope: &EventEnvelope<E>) -> Result<Self, StoreError> {
        Ok(Self {
            id: envelope.event_id,
            aggregate_type: envelope.aggregate_type.clone(),
            aggregate_id: envelope.aggregate_id,
            owner_firma_id: envelope.owner_firma_id,
            parties: envelope.parties.clone(),
            event_type: envelope.event_type.clone(),
            payload: serialize_event(&envelope.event_data)?,
            actor_user_id: envelope.user_id,
            actor_firma_id: envelope.firma_id,
            created_at: envelope.timestamp,
            attempts: 0,
            last_error: None,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub error_message: String,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn from_message(message: &OutboxMessage, error_message: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: message.id,
            aggregate_type: message.aggregate_type.clone(),
            aggregate_id: message.aggregate_id,
            event_type: message.event_type.clone(),
            payload: message.payload.clone(),
            error_message: error_message.to_string(),
            attempts: message.attempts,
            created_at: at,
        }
    }
}

// ============================================================================
// Store Traits
// ============================================================================

#[async_trait]
pub trait AggregateStore<A: Aggregate>: Send + Sync {
    async fn load(&self, id: Uuid) -> Result<Option<A>, StoreError>;

    /// Persist the new state together with the events that produced it.
    /// `expected_version` is the version the aggregate was loaded at (0 for new).
    async fn save(
        &self,
        aggregate: &A,
        expected_version: i64,
        events: &[EventEnvelope<A::Event>],
    ) -> Result<(), StoreError>;

    async fn list(&self, query: &ListQuery) -> Result<Vec<A>, StoreError>;

    async fn find_by_unique_key(&self, key: &str) -> Result<Option<A>, StoreError>;
}

#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Unprocessed messages in creation order.
    async fn fetch_pending(&self, limit: i64) -> Result<Vec<OutboxMessage>, StoreError>;

    async fn mark_processed(&self, id: Uuid) -> Result<(), StoreError>;

    /// Increment the attempt counter and return its new value.
    async fn record_failure(&self, id: Uuid, error: &str) -> Result<i32, StoreError>;

    /// Copy the message to the dead letters and take it out of the pending set.
    async fn move_to_dead_letters(&self, message: &OutboxMessage, error: &str) -> Result<(), StoreError>;

    async fn list_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetter>, StoreError>;

    async fn count_dead_letters(&self) -> Result<i64, StoreError>;

    async fn pending_count(&self) -> Result<i64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert notifications, skipping ids that already exist. Returns the number inserted.
    async fn insert(&self, notifications: &[Notification]) -> Result<u64, StoreError>;

    async fn list(
        &self,
        firma_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn unread_count(&self, firma_id: Uuid) -> Result<i64, StoreError>;

    /// Returns false when the notification does not exist for this firm.
    async fn mark_read(&self, firma_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError>;

    async fn mark_all_read(&self, firma_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError>;
}

// ============================================================================
// Stores - one handle per aggregate plus the shared tables
// ============================================================================

#[derive(Clone)]
pub struct Stores {
    pub firmalar: Arc<dyn AggregateStore<Firma>>,
    pub malzemeler: Arc<dyn AggregateStore<Malzeme>>,
    pub ihaleler: Arc<dyn AggregateStore<Ihale>>,
    pub siparisler: Arc<dyn AggregateStore<Siparis>>,
    pub users: Arc<dyn AggregateStore<User>>,
    pub outbox: Arc<dyn OutboxStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Stores {
    pub fn memory() -> Self {
        let backend = Arc::new(MemoryBackend::default());
        Self {
            firmalar: Arc::new(MemoryAggregateStore::new(backend.clone())),
            malzemeler: Arc::new(MemoryAggregateStore::new(backend.clone())),
            ihaleler: Arc::new(MemoryAggregateStore::new(backend.clone())),
            siparisler: Arc::new(MemoryAggregateStore::new(backend.clone())),
            users: Arc::new(MemoryAggregateStore::new(backend.clone())),
            outbox: backend.clone(),
            notifications: backend,
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let backend = Arc::new(PostgresBackend::new(pool.clone()));
        Self {
            firmalar: Arc::new(PostgresAggregateStore::new(pool.clone(), "firmalar")),
            malzemeler: Arc::new(PostgresAggregateStore::new(pool.clone(), "malzemeler")),
            ihaleler: Arc::new(PostgresAggregateStore::new(pool.clone(), "ihaleler")),
            siparisler: Arc::new(PostgresAggregateStore::new(pool.clone(), "siparisler")),
            users: Arc::new(PostgresAggregateStore::new(pool, "users")),
            outbox: backend.clone(),
            notifications: backend,
        }
    }
}
