use super::value_objects::{FirmaType, TaxNumber};

// ============================================================================
// Firma Commands
// ============================================================================

#[derive(Debug, Clone)]
pub enum FirmaCommand {
    Register {
        name: String,
        tax_number: TaxNumber,
        tax_office: Option<String>,
        address: Option<String>,
        phone: Option<String>,
        email: String,
        firma_type: FirmaType,
    },
    UpdateProfile {
        name: Option<String>,
        tax_office: Option<String>,
        address: Option<String>,
        phone: Option<String>,
        email: Option<String>,
        firma_type: Option<FirmaType>,
    },
    Approve,
    Deactivate {
        reason: String,
    },
    Activate,
    Delete,
}

impl FirmaCommand {
    pub fn name(&self) -> &'static str {
        match self {
            FirmaCommand::Register { .. } => "register",
            FirmaCommand::UpdateProfile { .. } => "update_profile",
            FirmaCommand::Approve => "approve",
            FirmaCommand::Deactivate { .. } => "deactivate",
            FirmaCommand::Activate => "activate",
            FirmaCommand::Delete => "delete",
        }
    }
}
