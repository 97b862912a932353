// ============================================================================
// Domain Core - Generic Aggregate Abstractions
// ============================================================================
//
// No firm, tender or order specific code lives here.
//
// ============================================================================

pub mod aggregate;
pub mod event;

pub use aggregate::{Aggregate, AggregateMeta};
pub use event::{deserialize_event, serialize_event, DomainEvent, EventEnvelope};
