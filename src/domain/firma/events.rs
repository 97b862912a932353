use serde::{Deserialize, Serialize};

use crate::domain::core::DomainEvent;
use super::value_objects::{FirmaType, TaxNumber};

// ============================================================================
// Firma Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FirmaEvent {
    Registered(FirmaRegistered),
    ProfileUpdated(FirmaProfileUpdated),
    Approved,
    Deactivated { reason: String },
    Activated,
    Deleted,
}

impl DomainEvent for FirmaEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FirmaEvent::Registered(_) => "FirmaRegistered",
            FirmaEvent::ProfileUpdated(_) => "FirmaProfileUpdated",
            FirmaEvent::Approved => "FirmaApproved",
            FirmaEvent::Deactivated { .. } => "FirmaDeactivated",
            FirmaEvent::Activated => "FirmaActivated",
            FirmaEvent::Deleted => "FirmaDeleted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmaRegistered {
    pub name: String,
    pub tax_number: TaxNumber,
    pub tax_office: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: String,
    pub firma_type: FirmaType,
}

/// Only the fields that changed are set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirmaProfileUpdated {
    pub name: Option<String>,
    pub tax_office: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub firma_type: Option<FirmaType>,
}
