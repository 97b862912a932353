use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::Currency;
use super::value_objects::{OrderNumber, SiparisKalemi, SiparisSource};

// ============================================================================
// Siparis Commands
// ============================================================================

#[derive(Debug, Clone)]
pub enum SiparisCommand {
    Create {
        order_no: OrderNumber,
        customer_firma_id: Uuid,
        supplier_firma_id: Uuid,
        source: Option<SiparisSource>,
        items: Vec<SiparisKalemi>,
        currency: Currency,
        delivery_address: Option<String>,
        requested_delivery_date: Option<NaiveDate>,
        note: Option<String>,
    },
    UpdateItems {
        items: Vec<SiparisKalemi>,
    },
    Confirm {
        at: DateTime<Utc>,
    },
    Reject {
        reason: String,
    },
    Ship {
        waybill_no: String,
        carrier: Option<String>,
        at: DateTime<Utc>,
    },
    Deliver {
        at: DateTime<Utc>,
    },
    Cancel {
        reason: String,
    },
    Delete,
}

impl SiparisCommand {
    pub fn name(&self) -> &'static str {
        match self {
            SiparisCommand::Create { .. } => "create",
            SiparisCommand::UpdateItems { .. } => "update_items",
            SiparisCommand::Confirm { .. } => "confirm",
            SiparisCommand::Reject { .. } => "reject",
            SiparisCommand::Ship { .. } => "ship",
            SiparisCommand::Deliver { .. } => "deliver",
            SiparisCommand::Cancel { .. } => "cancel",
            SiparisCommand::Delete => "delete",
        }
    }
}
