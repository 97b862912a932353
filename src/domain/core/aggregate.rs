use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use super::event::DomainEvent;

// ============================================================================
// Aggregate Root Pattern - State-Stored Aggregates
// ============================================================================
//
// Key Principles:
// 1. Commands are validated against current state before emitting events
// 2. Events represent facts that have already happened
// 3. The new state is derived by applying events to the old state
// 4. State and events are persisted together (state row + outbox rows)
//
// ============================================================================

/// Identity, version and audit columns shared by every aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMeta {
    pub id: Uuid,
    pub version: i64,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub modified_by: Option<Uuid>,
    pub modified_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl AggregateMeta {
    pub fn new(id: Uuid, created_by: Option<Uuid>, at: DateTime<Utc>) -> Self {
        Self {
            id,
            version: 0,
            created_by,
            created_at: at,
            modified_by: created_by,
            modified_at: at,
            is_deleted: false,
        }
    }

    /// Stamp the audit columns for a modification.
    pub fn touch(&mut self, modified_by: Option<Uuid>, at: DateTime<Utc>) {
        self.modified_by = modified_by;
        self.modified_at = at;
    }
}

/// Generic Aggregate trait - all aggregates implement this
///
/// Type Parameters:
/// - `Event`: The domain event type for this aggregate
/// - `Command`: The command type for this aggregate
/// - `Error`: The error type for business rule violations
pub trait Aggregate: Sized + Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    type Event: DomainEvent;
    type Command: Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Name used for tables, outbox rows and metric labels.
    const AGGREGATE_TYPE: &'static str;

    /// Validate a creation command and emit the events that bring the aggregate to life
    fn handle_creation(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Create new aggregate from first event
    fn apply_first_event(meta: AggregateMeta, event: &Self::Event) -> Result<Self, Self::Error>;

    /// Apply subsequent events to update state
    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error>;

    /// Handle command and emit events (business logic)
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Short command name for logs and metrics
    fn command_name(command: &Self::Command) -> &'static str;

    fn meta(&self) -> &AggregateMeta;

    fn meta_mut(&mut self) -> &mut AggregateMeta;

    /// Current status as stored in the `status` column
    fn status_label(&self) -> &'static str;

    /// Firm that owns the record, if any
    fn owner_firma_id(&self) -> Option<Uuid>;

    /// Every firm with a stake in the record; used for tenant-scoped listing.
    fn parties(&self) -> Vec<Uuid> {
        self.owner_firma_id().into_iter().collect()
    }

    /// Keys that must be unique across live aggregates of this type.
    fn unique_keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn aggregate_id(&self) -> Uuid {
        self.meta().id
    }

    fn version(&self) -> i64 {
        self.meta().version
    }

    fn is_deleted(&self) -> bool {
        self.meta().is_deleted
    }

    /// Build an aggregate from its creation events
    fn load_from_events(meta: AggregateMeta, events: &[Self::Event]) -> Result<Self, Self::Error> {
        let (first, rest) = events
            .split_first()
            .ok_or_else(Self::empty_history_error)?;

        let mut aggregate = Self::apply_first_event(meta, first)?;
        for event in rest {
            aggregate.apply_event(event)?;
        }

        Ok(aggregate)
    }

    /// Error returned when there is nothing to build an aggregate from
    fn empty_history_error() -> Self::Error;
}
