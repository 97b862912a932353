use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row, Transaction};
use std::marker::PhantomData;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::core::{Aggregate, EventEnvelope};
use crate::domain::notification::Notification;
use super::{
    AggregateStore, DeadLetter, ListQuery, NotificationStore, OutboxMessage, OutboxStore, StoreError,
};

// ============================================================================
// PostgreSQL Store
// ============================================================================
//
// One table per aggregate. Filterable columns are projected out of the
// aggregate; the full state lives in `data` (jsonb).
//
// ============================================================================

const SCHEMA: &str = include_str!("schema.sql");

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, "Connected to PostgreSQL");
    Ok(pool)
}

/// Create tables and indexes if they do not exist yet.
pub async fn apply_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    tracing::info!("Database schema is up to date");
    Ok(())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

async fn insert_outbox(
    tx: &mut Transaction<'_, Postgres>,
    message: &OutboxMessage,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO outbox_messages (
            id, aggregate_type, aggregate_id, owner_firma_id, parties, event_type,
            payload, actor_user_id, actor_firma_id, created_at, attempts
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0)",
    )
    .bind(message.id)
    .bind(&message.aggregate_type)
    .bind(message.aggregate_id)
    .bind(message.owner_firma_id)
    .bind(&message.parties)
    .bind(&message.event_type)
    .bind(&message.payload)
    .bind(message.actor_user_id)
    .bind(message.actor_firma_id)
    .bind(message.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ============================================================================
// Aggregate Tables
// ============================================================================

pub struct PostgresAggregateStore<A> {
    pool: PgPool,
    table: &'static str,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A: Aggregate> PostgresAggregateStore<A> {
    pub fn new(pool: PgPool, table: &'static str) -> Self {
        Self { pool, table, _aggregate: PhantomData }
    }

    fn decode(row: &PgRow) -> Result<A, StoreError> {
        let Json(aggregate) = row.try_get::<Json<A>, _>("data")?;
        Ok(aggregate)
    }

    fn conflict(&self, aggregate: &A, expected_version: i64) -> StoreError {
        StoreError::Concurrency {
            aggregate_type: A::AGGREGATE_TYPE,
            id: aggregate.aggregate_id(),
            expected: expected_version,
        }
    }

    async fn write_row(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        aggregate: &A,
        expected_version: i64,
    ) -> Result<(), StoreError> {
        let meta = aggregate.meta();

        if expected_version == 0 {
            let sql = format!(
                "INSERT INTO {} (
                    id, version, status, owner_firma_id, parties, data, is_deleted,
                    created_by, created_at, modified_by, modified_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
                self.table
            );
            sqlx::query(&sql)
                .bind(meta.id)
                .bind(meta.version)
                .bind(aggregate.status_label())
                .bind(aggregate.owner_firma_id())
                .bind(aggregate.parties())
                .bind(Json(aggregate))
                .bind(meta.is_deleted)
                .bind(meta.created_by)
                .bind(meta.created_at)
                .bind(meta.modified_by)
                .bind(meta.modified_at)
                .execute(&mut **tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        self.conflict(aggregate, expected_version)
                    } else {
                        StoreError::from(e)
                    }
                })?;
            return Ok(());
        }

        let sql = format!(
            "UPDATE {} SET
                version = $2, status = $3, owner_firma_id = $4, parties = $5, data = $6,
                is_deleted = $7, modified_by = $8, modified_at = $9
             WHERE id = $1 AND version = $10",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(meta.id)
            .bind(meta.version)
            .bind(aggregate.status_label())
            .bind(aggregate.owner_firma_id())
            .bind(aggregate.parties())
            .bind(Json(aggregate))
            .bind(meta.is_deleted)
            .bind(meta.modified_by)
            .bind(meta.modified_at)
            .bind(expected_version)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.conflict(aggregate, expected_version));
        }
        Ok(())
    }

    async fn write_unique_keys(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        aggregate: &A,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM unique_keys WHERE aggregate_type = $1 AND aggregate_id = $2")
            .bind(A::AGGREGATE_TYPE)
            .bind(aggregate.aggregate_id())
            .execute(&mut **tx)
            .await?;

        for key in aggregate.unique_keys() {
            sqlx::query("INSERT INTO unique_keys (aggregate_type, unique_key, aggregate_id) VALUES ($1, $2, $3)")
                .bind(A::AGGREGATE_TYPE)
                .bind(&key)
                .bind(aggregate.aggregate_id())
                .execute(&mut **tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StoreError::UniqueViolation(key.clone())
                    } else {
                        StoreError::from(e)
                    }
                })?;
        }
        Ok(())
    }
}

#[async_trait]
impl<A: Aggregate> AggregateStore<A> for PostgresAggregateStore<A> {
    async fn load(&self, id: Uuid) -> Result<Option<A>, StoreError> {
        let sql = format!("SELECT data FROM {} WHERE id = $1", self.table);
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::decode).transpose()
    }

    async fn save(
        &self,
        aggregate: &A,
        expected_version: i64,
        events: &[EventEnvelope<A::Event>],
    ) -> Result<(), StoreError> {
        let messages = events
            .iter()
            .map(OutboxMessage::from_envelope)
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool.begin().await?;

        self.write_row(&mut tx, aggregate, expected_version).await?;
        self.write_unique_keys(&mut tx, aggregate).await?;
        for message in &messages {
            insert_outbox(&mut tx, message).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %aggregate.aggregate_id(),
            version = aggregate.version(),
            event_count = messages.len(),
            "Saved aggregate state and outbox rows"
        );
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<A>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT data FROM {} WHERE TRUE", self.table));

        if !query.include_deleted {
            qb.push(" AND is_deleted = FALSE");
        }
        if let Some(owner) = query.owner_firma_id {
            qb.push(" AND owner_firma_id = ").push_bind(owner);
        }
        if let Some(party) = query.party_firma_id {
            qb.push(" AND ").push_bind(party).push(" = ANY(parties)");
        }
        if !query.statuses.is_empty() {
            qb.push(" AND status = ANY(").push_bind(query.statuses.clone()).push(")");
        }
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::decode).collect()
    }

    async fn find_by_unique_key(&self, key: &str) -> Result<Option<A>, StoreError> {
        let sql = format!(
            "SELECT t.data FROM {} t
             JOIN unique_keys k ON k.aggregate_id = t.id
             WHERE k.aggregate_type = $1 AND k.unique_key = $2",
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(A::AGGREGATE_TYPE)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::decode).transpose()
    }
}

// ============================================================================
// Outbox, Dead Letters and Notifications
// ============================================================================

pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_outbox(row: &PgRow) -> Result<OutboxMessage, StoreError> {
        Ok(OutboxMessage {
            id: row.try_get("id")?,
            aggregate_type: row.try_get("aggregate_type")?,
            aggregate_id: row.try_get("aggregate_id")?,
            owner_firma_id: row.try_get("owner_firma_id")?,
            parties: row.try_get("parties")?,
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            actor_user_id: row.try_get("actor_user_id")?,
            actor_firma_id: row.try_get("actor_firma_id")?,
            created_at: row.try_get("created_at")?,
            attempts: row.try_get("attempts")?,
            last_error: row.try_get("last_error")?,
        })
    }

    fn row_to_dead_letter(row: &PgRow) -> Result<DeadLetter, StoreError> {
        Ok(DeadLetter {
            id: row.try_get("id")?,
            aggregate_type: row.try_get("aggregate_type")?,
            aggregate_id: row.try_get("aggregate_id")?,
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            error_message: row.try_get("error_message")?,
            attempts: row.try_get("attempts")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_notification(row: &PgRow) -> Result<Notification, StoreError> {
        Ok(Notification {
            id: row.try_get("id")?,
            firma_id: row.try_get("firma_id")?,
            title: row.try_get("title")?,
            message: row.try_get("message")?,
            event_type: row.try_get("event_type")?,
            aggregate_type: row.try_get("aggregate_type")?,
            aggregate_id: row.try_get("aggregate_id")?,
            is_read: row.try_get("is_read")?,
            created_at: row.try_get("created_at")?,
            read_at: row.try_get("read_at")?,
        })
    }
}

#[async_trait]
impl OutboxStore for PostgresBackend {
    async fn fetch_pending(&self, limit: i64) -> Result<Vec<OutboxMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, aggregate_type, aggregate_id, owner_firma_id, parties, event_type, payload,
                    actor_user_id, actor_firma_id, created_at, attempts, last_error
             FROM outbox_messages
             WHERE processed_at IS NULL
             ORDER BY created_at, id
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_outbox).collect()
    }

    async fn mark_processed(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE outbox_messages SET processed_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_failure(&self, id: Uuid, error: &str) -> Result<i32, StoreError> {
        let row = sqlx::query(
            "UPDATE outbox_messages SET attempts = attempts + 1, last_error = $2
             WHERE id = $1
             RETURNING attempts",
        )
        .bind(id)
        .bind(error)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { aggregate_type: "OutboxMessage", id })?;

        Ok(row.try_get("attempts")?)
    }

    async fn move_to_dead_letters(&self, message: &OutboxMessage, error: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO dead_letters (
                id, aggregate_type, aggregate_id, event_type, payload, error_message, attempts, created_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, now())
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(message.id)
        .bind(&message.aggregate_type)
        .bind(message.aggregate_id)
        .bind(&message.event_type)
        .bind(&message.payload)
        .bind(error)
        .bind(message.attempts)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE outbox_messages SET processed_at = now(), last_error = $2 WHERE id = $1")
            .bind(message.id)
            .bind(error)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetter>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, aggregate_type, aggregate_id, event_type, payload, error_message, attempts, created_at
             FROM dead_letters
             ORDER BY created_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_dead_letter).collect()
    }

    async fn count_dead_letters(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM dead_letters")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    async fn pending_count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM outbox_messages WHERE processed_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for PostgresBackend {
    async fn insert(&self, notifications: &[Notification]) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for n in notifications {
            let result = sqlx::query(
                "INSERT INTO notifications (
                    id, firma_id, title, message, event_type, aggregate_type, aggregate_id,
                    is_read, created_at, read_at
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(n.id)
            .bind(n.firma_id)
            .bind(&n.title)
            .bind(&n.message)
            .bind(&n.event_type)
            .bind(&n.aggregate_type)
            .bind(n.aggregate_id)
            .bind(n.is_read)
            .bind(n.created_at)
            .bind(n.read_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn list(
        &self,
        firma_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, firma_id, title, message, event_type, aggregate_type, aggregate_id,
                    is_read, created_at, read_at
             FROM notifications
             WHERE firma_id = $1 AND (NOT $2 OR is_read = FALSE)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(firma_id)
        .bind(unread_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_notification).collect()
    }

    async fn unread_count(&self, firma_id: Uuid) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM notifications WHERE firma_id = $1 AND is_read = FALSE")
            .bind(firma_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    async fn mark_read(&self, firma_id: Uuid, id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, $3)
             WHERE id = $1 AND firma_id = $2",
        )
        .bind(id)
        .bind(firma_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, firma_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $2
             WHERE firma_id = $1 AND is_read = FALSE",
        )
        .bind(firma_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
