use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Unit;

// ============================================================================
// Ihale Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IhaleStatus {
    Draft,
    Published,
    Closed,
    Awarded,
    Cancelled,
}

impl IhaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IhaleStatus::Draft => "Draft",
            IhaleStatus::Published => "Published",
            IhaleStatus::Closed => "Closed",
            IhaleStatus::Awarded => "Awarded",
            IhaleStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeklifStatus {
    Submitted,
    Accepted,
    Rejected,
    Withdrawn,
}

/// A requested line of a tender. `item_no` is 1-based and unique per tender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IhaleKalemi {
    pub item_no: u32,
    pub malzeme_id: Option<Uuid>,
    pub description: String,
    pub quantity: Decimal,
    pub unit: Unit,
}

/// The supplier's price for one tender line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeklifKalemi {
    pub item_no: u32,
    pub unit_price: Decimal,
    pub lead_time_days: Option<u32>,
}

/// A bid placed by a supplier firm against a tender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teklif {
    pub id: Uuid,
    pub supplier_firma_id: Uuid,
    pub items: Vec<TeklifKalemi>,
    pub total: Decimal,
    pub note: Option<String>,
    pub status: TeklifStatus,
    pub submitted_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
}

impl Teklif {
    pub fn is_open(&self) -> bool {
        self.status == TeklifStatus::Submitted
    }
}
