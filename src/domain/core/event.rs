use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Event Envelope - Event Metadata
// ============================================================================
//
// Wraps domain events with the metadata the outbox needs: which aggregate
// produced them, at which version, and on whose behalf.
//
// ============================================================================

/// Generic Event Envelope - wraps any domain event with metadata
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EventEnvelope<E> {
    // Event Identity
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub sequence_number: i64,

    // Event Type Information
    pub event_type: String,

    // Event Payload
    pub event_data: E,

    // Groups the events emitted by a single command
    pub correlation_id: Uuid,

    // Actor Information
    pub user_id: Option<Uuid>,
    pub firma_id: Option<Uuid>,

    // Ownership of the aggregate at the time of the event
    pub owner_firma_id: Option<Uuid>,
    pub parties: Vec<Uuid>,

    // Timing
    pub timestamp: DateTime<Utc>,
}

impl<E: DomainEvent> EventEnvelope<E> {
    pub fn new(
        aggregate_id: Uuid,
        aggregate_type: &str,
        sequence_number: i64,
        event_data: E,
        correlation_id: Uuid,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            sequence_number,
            event_type: event_data.event_type().to_string(),
            event_data,
            correlation_id,
            user_id: None,
            firma_id: None,
            owner_firma_id: None,
            parties: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_caller(mut self, user_id: Option<Uuid>, firma_id: Option<Uuid>) -> Self {
        self.user_id = user_id;
        self.firma_id = firma_id;
        self
    }

    pub fn with_owner(mut self, owner_firma_id: Option<Uuid>, parties: Vec<Uuid>) -> Self {
        self.owner_firma_id = owner_firma_id;
        self.parties = parties;
        self
    }
}

// ============================================================================
// Domain Event Trait
// ============================================================================

/// All domain events implement this trait to be written to the outbox.
pub trait DomainEvent:
    Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static
{
    /// Stable name of the concrete event, e.g. `SiparisShipped`
    fn event_type(&self) -> &'static str;
}

pub fn serialize_event<E: Serialize>(event: &E) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(event)
}

pub fn deserialize_event<E: DeserializeOwned>(payload: &serde_json::Value) -> serde_json::Result<E> {
    E::deserialize(payload)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    #[serde(tag = "type", content = "data")]
    enum TestEvent {
        Happened { note: String },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            "TestHappened"
        }
    }

    #[test]
    fn test_event_envelope_creation() {
        let aggregate_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let firma_id = Uuid::new_v4();

        let envelope = EventEnvelope::new(
            aggregate_id,
            "Test",
            3,
            TestEvent::Happened { note: "x".into() },
            correlation_id,
        )
        .with_caller(Some(user_id), Some(firma_id))
        .with_owner(Some(firma_id), vec![firma_id]);

        assert_eq!(envelope.aggregate_id, aggregate_id);
        assert_eq!(envelope.aggregate_type, "Test");
        assert_eq!(envelope.sequence_number, 3);
        assert_eq!(envelope.event_type, "TestHappened");
        assert_eq!(envelope.correlation_id, correlation_id);
        assert_eq!(envelope.user_id, Some(user_id));
        assert_eq!(envelope.owner_firma_id, Some(firma_id));
        assert_eq!(envelope.parties, vec![firma_id]);
    }

    #[test]
    fn test_payload_keeps_variant_tag() {
        let event = TestEvent::Happened { note: "hello".into() };

        let json = serialize_event(&event).unwrap();
        assert_eq!(json["type"], "Happened");

        let back: TestEvent = deserialize_event(&json).unwrap();
        assert_eq!(back, event);
    }
}
