use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::core::DomainEvent;
use crate::models::Currency;
use super::value_objects::{IhaleKalemi, Teklif};

// ============================================================================
// Ihale Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum IhaleEvent {
    Created(IhaleCreated),
    DraftUpdated(IhaleDraftUpdated),
    Published {
        at: DateTime<Utc>,
    },
    BidSubmitted(Teklif),
    BidWithdrawn {
        teklif_id: Uuid,
        supplier_firma_id: Uuid,
        at: DateTime<Utc>,
    },
    Closed {
        at: DateTime<Utc>,
    },
    /// Accepting a bid awards the tender
    BidAccepted {
        teklif_id: Uuid,
        supplier_firma_id: Uuid,
        at: DateTime<Utc>,
    },
    BidRejected {
        teklif_id: Uuid,
        supplier_firma_id: Uuid,
        reason: String,
        at: DateTime<Utc>,
    },
    Cancelled {
        reason: String,
        at: DateTime<Utc>,
    },
    Deleted,
}

impl DomainEvent for IhaleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            IhaleEvent::Created(_) => "IhaleCreated",
            IhaleEvent::DraftUpdated(_) => "IhaleDraftUpdated",
            IhaleEvent::Published { .. } => "IhalePublished",
            IhaleEvent::BidSubmitted(_) => "TeklifSubmitted",
            IhaleEvent::BidWithdrawn { .. } => "TeklifWithdrawn",
            IhaleEvent::Closed { .. } => "IhaleClosed",
            IhaleEvent::BidAccepted { .. } => "TeklifAccepted",
            IhaleEvent::BidRejected { .. } => "TeklifRejected",
            IhaleEvent::Cancelled { .. } => "IhaleCancelled",
            IhaleEvent::Deleted => "IhaleDeleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IhaleCreated {
    pub customer_firma_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<IhaleKalemi>,
    pub currency: Currency,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IhaleDraftUpdated {
    pub title: Option<String>,
    pub description: Option<String>,
    pub items: Option<Vec<IhaleKalemi>>,
    pub deadline: Option<DateTime<Utc>>,
}
