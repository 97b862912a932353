use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Notification - a message addressed to one firm
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub firma_id: Uuid,
    pub title: String,
    pub message: String,
    pub event_type: String,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// The id is derived from the source message and the recipient, so the
    /// same message delivered twice yields the same notification.
    pub fn id_for(source_id: Uuid, firma_id: Uuid) -> Uuid {
        Uuid::new_v5(&source_id, firma_id.as_bytes())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_id: Uuid,
        firma_id: Uuid,
        title: impl Into<String>,
        message: impl Into<String>,
        event_type: &str,
        aggregate_type: &str,
        aggregate_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::id_for(source_id, firma_id),
            firma_id,
            title: title.into(),
            message: message.into(),
            event_type: event_type.to_string(),
            aggregate_type: aggregate_type.to_string(),
            aggregate_id,
            is_read: false,
            created_at,
            read_at: None,
        }
    }

    pub fn mark_read(&mut self, at: DateTime<Utc>) {
        if !self.is_read {
            self.is_read = true;
            self.read_at = Some(at);
        }
    }
}
