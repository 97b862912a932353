use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::core::DomainEvent;
use crate::models::{Currency, Unit};
use super::value_objects::MaterialCode;

// ============================================================================
// Malzeme Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MalzemeEvent {
    Created(MalzemeCreated),
    Updated(MalzemeUpdated),
    PriceChanged {
        old_price: Decimal,
        new_price: Decimal,
        currency: Currency,
    },
    Deactivated,
    Activated,
    Deleted,
}

impl DomainEvent for MalzemeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MalzemeEvent::Created(_) => "MalzemeCreated",
            MalzemeEvent::Updated(_) => "MalzemeUpdated",
            MalzemeEvent::PriceChanged { .. } => "MalzemePriceChanged",
            MalzemeEvent::Deactivated => "MalzemeDeactivated",
            MalzemeEvent::Activated => "MalzemeActivated",
            MalzemeEvent::Deleted => "MalzemeDeleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalzemeCreated {
    pub firma_id: Uuid,
    pub code: MaterialCode,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Unit,
    pub unit_price: Decimal,
    pub currency: Currency,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MalzemeUpdated {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<Unit>,
}
