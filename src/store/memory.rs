use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::core::{Aggregate, EventEnvelope};
use crate::domain::notification::Notification;
use super::{
    AggregateStore, DeadLetter, ListQuery, NotificationStore, OutboxMessage, OutboxStore, StoreError,
};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Same contract as the Postgres store, for tests and local runs. All tables
// sit behind one lock so a save is atomic across row, keys and outbox.
//
// ============================================================================

#[derive(Debug, Clone)]
struct MemoryRow {
    version: i64,
    status: String,
    owner_firma_id: Option<Uuid>,
    parties: Vec<Uuid>,
    is_deleted: bool,
    created_at: DateTime<Utc>,
    data: serde_json::Value,
}

#[derive(Debug, Default)]
struct MemoryState {
    rows: HashMap<&'static str, HashMap<Uuid, MemoryRow>>,
    unique_keys: HashMap<(&'static str, String), Uuid>,
    outbox: Vec<(OutboxMessage, bool)>,
    dead_letters: Vec<DeadLetter>,
    notifications: Vec<Notification>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    /// Queue a message as if a command had written it.
    #[cfg(test)]
    pub(crate) async fn push_outbox(&self, message: OutboxMessage) {
        self.state.write().await.outbox.push((message, false));
    }
}

pub struct MemoryAggregateStore<A> {
    backend: Arc<MemoryBackend>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A: Aggregate> MemoryAggregateStore<A> {
    pub fn new(backend: Arc<MemoryBackend>) -> Self {
        Self { backend, _aggregate: PhantomData }
    }
}

#[async_trait]
impl<A: Aggregate> AggregateStore<A> for MemoryAggregateStore<A> {
    async fn load(&self, id: Uuid) -> Result<Option<A>, StoreError> {
        let state = self.backend.state.read().await;
        state
            .rows
            .get(A::AGGREGATE_TYPE)
            .and_then(|table| table.get(&id))
            .map(|row| serde_json::from_value(row.data.clone()).map_err(StoreError::from))
            .transpose()
    }

    async fn save(
        &self,
        aggregate: &A,
        expected_version: i64,
        events: &[EventEnvelope<A::Event>],
    ) -> Result<(), StoreError> {
        let id = aggregate.aggregate_id();
        let data = serde_json::to_value(aggregate)?;
        let messages = events
            .iter()
            .map(OutboxMessage::from_envelope)
            .collect::<Result<Vec<_>, _>>()?;

        let mut guard = self.backend.state.write().await;
        let state = &mut *guard;

        let table = state.rows.entry(A::AGGREGATE_TYPE).or_default();
        let current = table.get(&id).map(|row| row.version).unwrap_or(0);
        let exists = table.contains_key(&id);
        if current != expected_version || (expected_version == 0 && exists) {
            return Err(StoreError::Concurrency { aggregate_type: A::AGGREGATE_TYPE, id, expected: expected_version });
        }

        let keys = aggregate.unique_keys();
        for key in &keys {
            if let Some(holder) = state.unique_keys.get(&(A::AGGREGATE_TYPE, key.clone())) {
                if *holder != id {
                    return Err(StoreError::UniqueViolation(key.clone()));
                }
            }
        }

        let created_at = table.get(&id).map(|row| row.created_at).unwrap_or(aggregate.meta().created_at);
        table.insert(
            id,
            MemoryRow {
                version: aggregate.version(),
                status: aggregate.status_label().to_string(),
                owner_firma_id: aggregate.owner_firma_id(),
                parties: aggregate.parties(),
                is_deleted: aggregate.is_deleted(),
                created_at,
                data,
            },
        );

        state.unique_keys.retain(|(kind, _), holder| !(*kind == A::AGGREGATE_TYPE && *holder == id));
        for key in keys {
            state.unique_keys.insert((A::AGGREGATE_TYPE, key), id);
        }

        state.outbox.extend(messages.into_iter().map(|m| (m, false)));
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<A>, StoreError> {
        let state = self.backend.state.read().await;
        let Some(table) = state.rows.get(A::AGGREGATE_TYPE) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<&MemoryRow> = table
            .values()
            .filter(|row| query.matches(&row.status, row.owner_firma_id, &row.parties, row.is_deleted))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        rows.into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .map(|row| serde_json::from_value(row.data.clone()).map_err(StoreError::from))
            .collect()
    }

    async fn find_by_unique_key(&self, key: &str) -> Result<Option<A>, StoreError> {
        let id = {
            let state = self.backend.state.read().await;
            state.unique_keys.get(&(A::AGGREGATE_TYPE, key.to_string())).copied()
        };
        match id {
            Some(id) => self.load(id).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OutboxStore for MemoryBackend {
    async fn fetch_pending(&self, limit: i64) -> Result<Vec<OutboxMessage>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .outbox
            .iter()
            .filter(|(_, processed)| !processed)
            .take(limit.max(0) as usize)
            .map(|(message, _)| message.clone())
            .collect())
    }

    async fn mark_processed(&self, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if let Some(entry) = state.outbox.iter_mut().find(|(m, _)| m.id == id) {
            entry.1 = true;
        }
        Ok(())
    }

    async fn record_failure(&self, id: Uuid, error: &str) -> Result<i32, StoreError> {
        let mut state = self.state.write().await;
        let (message, _) = state
            .outbox
            .iter_mut()
            .find(|(m, _)| m.id == id)
            .ok_or(StoreError::NotFound { aggregate_type: "OutboxMessage", id })?;
        message.attempts += 1;
        message.last_error = Some(error.to_string());
        Ok(message.attempts)
    }

    async fn move_to_dead_letters(&self, message: &OutboxMessage, error: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.dead_letters.iter().any(|d| d.id == message.id) {
            state.dead_letters.push(DeadLetter::from_message(message, error, Utc::now()));
        }
        if let Some(entry) = state.outbox.iter_mut().find(|(m, _)| m.id == message.id) {
            entry.0.last_error = Some(error.to_string());
            entry.1 = true;
        }
        Ok(())
    }

    async fn list_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetter>, StoreError> {
        let state = self.state.read().await;
        Ok(state.dead_letters.iter().rev().take(limit.max(0) as usize).cloned().collect())
    }

    async fn count_dead_letters(&self) -> Result<i64, StoreError> {
        Ok(self.state.read().await.dead_letters.len() as i64)
    }

    async fn pending_count(&self) -> Result<i64, StoreError> {
        let state = self.state.read().await;
        Ok(state.outbox.iter().filter(|(_, processed)| !processed).count() as i64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for MemoryBackend {
    async fn insert(&self, notifications: &[Notification]) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let mut inserted = 0;
        for notification in notifications {
            if !state.notifications.iter().any(|n| n.id == notification.id) {
                state.notifications.push(notification.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn list(
        &self,
        firma_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let state = self.state.read().await;
        let mut found: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.firma_id == firma_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn unread_count(&self, firma_id: Uuid) -> Result<i64, StoreError> {
        let state = self.state.read().await;
        Ok(state.notifications.iter().filter(|n| n.firma_id == firma_id && !n.is_read).count() as i64)
    }

    async fn mark_read(&self, firma_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.notifications.iter_mut().find(|n| n.id == id && n.firma_id == firma_id) {
            Some(notification) => {
                notification.mark_read(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, firma_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for notification in state.notifications.iter_mut().filter(|n| n.firma_id == firma_id && !n.is_read) {
            notification.mark_read(at);
            changed += 1;
        }
        Ok(changed)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
