use actix::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::Metrics;
use crate::store::{DeadLetter, OutboxMessage, OutboxStore, StoreError};

// ============================================================================
// Dead Letter Queue Actor
// ============================================================================
//
// Receives outbox messages the relay gave up on. Provides:
// - Persistent storage of failed messages (dead_letters table)
// - Listing for manual intervention by admins
// - Metrics on failure patterns
//
// ============================================================================

pub struct DlqActor {
    outbox: Arc<dyn OutboxStore>,
    metrics: Arc<Metrics>,
}

impl DlqActor {
    pub fn new(outbox: Arc<dyn OutboxStore>, metrics: Arc<Metrics>) -> Self {
        Self { outbox, metrics }
    }
}

impl Actor for DlqActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("DlqActor started - Dead Letter Queue ready");
    }
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Message, Debug, Clone)]
#[rtype(result = "Result<(), StoreError>")]
pub struct AddToDlq {
    pub message: OutboxMessage,
    pub error_message: String,
}

#[derive(Message)]
#[rtype(result = "Result<Vec<DeadLetter>, StoreError>")]
pub struct GetDeadLetters {
    pub limit: i64,
}

#[derive(Message)]
#[rtype(result = "Result<DlqStats, StoreError>")]
pub struct GetDlqStats;

#[derive(Debug, Clone, Serialize)]
pub struct DlqStats {
    pub total_messages: i64,
}

// ============================================================================
// Handlers
// ============================================================================

impl Handler<AddToDlq> for DlqActor {
    type Result = ResponseFuture<Result<(), StoreError>>;

    fn handle(&mut self, msg: AddToDlq, _: &mut Self::Context) -> Self::Result {
        let outbox = self.outbox.clone();
        let metrics = self.metrics.clone();

        tracing::error!(
            event_id = %msg.message.id,
            event_type = %msg.message.event_type,
            aggregate_id = %msg.message.aggregate_id,
            error = %msg.error_message,
            attempts = msg.message.attempts,
            "💀 Adding message to Dead Letter Queue"
        );

        Box::pin(async move {
            outbox.move_to_dead_letters(&msg.message, &msg.error_message).await?;
            metrics.record_dlq_message(&msg.message.event_type);

            tracing::info!(event_id = %msg.message.id, "Message successfully stored in DLQ");
            Ok(())
        })
    }
}

impl Handler<GetDeadLetters> for DlqActor {
    type Result = ResponseFuture<Result<Vec<DeadLetter>, StoreError>>;

    fn handle(&mut self, msg: GetDeadLetters, _: &mut Self::Context) -> Self::Result {
        let outbox = self.outbox.clone();
        Box::pin(async move { outbox.list_dead_letters(msg.limit.clamp(1, 500)).await })
    }
}

impl Handler<GetDlqStats> for DlqActor {
    type Result = ResponseFuture<Result<DlqStats, StoreError>>;

    fn handle(&mut self, _msg: GetDlqStats, _: &mut Self::Context) -> Self::Result {
        let outbox = self.outbox.clone();
        Box::pin(async move {
            let total_messages = outbox.count_dead_letters().await?;
            Ok(DlqStats { total_messages })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use chrono::Utc;
    use uuid::Uuid;

    fn message() -> OutboxMessage {
        let firma = Uuid::new_v4();
        OutboxMessage {
            id: Uuid::now_v7(),
            aggregate_type: "Siparis".into(),
            aggregate_id: Uuid::new_v4(),
            owner_firma_id: Some(firma),
            parties: vec![firma],
            event_type: "SiparisCreated".into(),
            payload: serde_json::json!({"type": "Broken"}),
            actor_user_id: None,
            actor_firma_id: None,
            created_at: Utc::now(),
            attempts: 5,
            last_error: None,
        }
    }

    #[actix::test]
    async fn test_dead_letters_are_stored_once_and_counted() {
        let backend = Arc::new(MemoryBackend::default());
        let metrics = Arc::new(Metrics::new().unwrap());
        let dlq = DlqActor::new(backend.clone(), metrics.clone()).start();

        let msg = message();
        let add = AddToDlq { message: msg.clone(), error_message: "unknown variant".into() };
        dlq.send(add.clone()).await.unwrap().unwrap();
        dlq.send(add).await.unwrap().unwrap();

        let stats = dlq.send(GetDlqStats).await.unwrap().unwrap();
        assert_eq!(stats.total_messages, 1);

        let letters = dlq.send(GetDeadLetters { limit: 10 }).await.unwrap().unwrap();
        assert_eq!(letters[0].id, msg.id);
        assert_eq!(letters[0].error_message, "unknown variant");
        assert_eq!(metrics.dlq_messages_total.get(), 2);
    }
}
