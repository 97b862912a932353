use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::core::DomainEvent;
use crate::models::Currency;
use super::value_objects::{OrderNumber, Shipment, SiparisKalemi, SiparisSource};

// ============================================================================
// Siparis Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SiparisEvent {
    Created(SiparisCreated),
    ItemsUpdated {
        items: Vec<SiparisKalemi>,
    },
    Confirmed {
        at: DateTime<Utc>,
    },
    Rejected {
        reason: String,
    },
    Shipped(Shipment),
    Delivered {
        at: DateTime<Utc>,
    },
    Cancelled {
        reason: String,
    },
    Deleted,
}

impl DomainEvent for SiparisEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SiparisEvent::Created(_) => "SiparisCreated",
            SiparisEvent::ItemsUpdated { .. } => "SiparisItemsUpdated",
            SiparisEvent::Confirmed { .. } => "SiparisConfirmed",
            SiparisEvent::Rejected { .. } => "SiparisRejected",
            SiparisEvent::Shipped(_) => "SiparisShipped",
            SiparisEvent::Delivered { .. } => "SiparisDelivered",
            SiparisEvent::Cancelled { .. } => "SiparisCancelled",
            SiparisEvent::Deleted => "SiparisDeleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiparisCreated {
    pub order_no: OrderNumber,
    pub customer_firma_id: Uuid,
    pub supplier_firma_id: Uuid,
    pub source: Option<SiparisSource>,
    pub items: Vec<SiparisKalemi>,
    pub currency: Currency,
    pub delivery_address: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
    pub note: Option<String>,
}
