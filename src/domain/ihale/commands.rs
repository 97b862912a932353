use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::Currency;
use super::value_objects::{IhaleKalemi, TeklifKalemi};

// ============================================================================
// Ihale Commands
// ============================================================================
//
// Commands that depend on the clock carry `at` so the aggregate stays pure.
//
// ============================================================================

#[derive(Debug, Clone)]
pub enum IhaleCommand {
    Create {
        customer_firma_id: Uuid,
        title: String,
        description: Option<String>,
        items: Vec<IhaleKalemi>,
        currency: Currency,
        deadline: DateTime<Utc>,
    },
    UpdateDraft {
        title: Option<String>,
        description: Option<String>,
        items: Option<Vec<IhaleKalemi>>,
        deadline: Option<DateTime<Utc>>,
    },
    Publish {
        at: DateTime<Utc>,
    },
    SubmitBid {
        teklif_id: Uuid,
        supplier_firma_id: Uuid,
        items: Vec<TeklifKalemi>,
        note: Option<String>,
        at: DateTime<Utc>,
    },
    WithdrawBid {
        teklif_id: Uuid,
        supplier_firma_id: Uuid,
        at: DateTime<Utc>,
    },
    Close {
        at: DateTime<Utc>,
    },
    AcceptBid {
        teklif_id: Uuid,
        at: DateTime<Utc>,
    },
    RejectBid {
        teklif_id: Uuid,
        reason: String,
        at: DateTime<Utc>,
    },
    Cancel {
        reason: String,
        at: DateTime<Utc>,
    },
    Delete,
}

impl IhaleCommand {
    pub fn name(&self) -> &'static str {
        match self {
            IhaleCommand::Create { .. } => "create",
            IhaleCommand::UpdateDraft { .. } => "update_draft",
            IhaleCommand::Publish { .. } => "publish",
            IhaleCommand::SubmitBid { .. } => "submit_bid",
            IhaleCommand::WithdrawBid { .. } => "withdraw_bid",
            IhaleCommand::Close { .. } => "close",
            IhaleCommand::AcceptBid { .. } => "accept_bid",
            IhaleCommand::RejectBid { .. } => "reject_bid",
            IhaleCommand::Cancel { .. } => "cancel",
            IhaleCommand::Delete => "delete",
        }
    }
}
