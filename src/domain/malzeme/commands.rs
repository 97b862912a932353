use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Currency, Unit};
use super::value_objects::MaterialCode;

// ============================================================================
// Malzeme Commands
// ============================================================================

#[derive(Debug, Clone)]
pub enum MalzemeCommand {
    Create {
        firma_id: Uuid,
        code: MaterialCode,
        name: String,
        description: Option<String>,
        category: Option<String>,
        unit: Unit,
        unit_price: Decimal,
        currency: Currency,
    },
    Update {
        name: Option<String>,
        description: Option<String>,
        category: Option<String>,
        unit: Option<Unit>,
    },
    ChangePrice {
        unit_price: Decimal,
        currency: Currency,
    },
    Deactivate,
    Activate,
    Delete,
}

impl MalzemeCommand {
    pub fn name(&self) -> &'static str {
        match self {
            MalzemeCommand::Create { .. } => "create",
            MalzemeCommand::Update { .. } => "update",
            MalzemeCommand::ChangePrice { .. } => "change_price",
            MalzemeCommand::Deactivate => "deactivate",
            MalzemeCommand::Activate => "activate",
            MalzemeCommand::Delete => "delete",
        }
    }
}
