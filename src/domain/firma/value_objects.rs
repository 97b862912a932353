use serde::{Deserialize, Serialize};

// ============================================================================
// Firma Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirmaType {
    Customer,
    Supplier,
    Both,
}

impl FirmaType {
    pub fn is_customer(&self) -> bool {
        matches!(self, FirmaType::Customer | FirmaType::Both)
    }

    pub fn is_supplier(&self) -> bool {
        matches!(self, FirmaType::Supplier | FirmaType::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirmaStatus {
    PendingApproval,
    Active,
    Passive,
}

impl FirmaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirmaStatus::PendingApproval => "PendingApproval",
            FirmaStatus::Active => "Active",
            FirmaStatus::Passive => "Passive",
        }
    }
}

/// Turkish tax identifier: 10 digits (VKN) for companies, 11 digits (TCKN)
/// for sole proprietors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxNumber(pub String);

impl TaxNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        matches!(self.0.len(), 10 | 11) && self.0.chars().all(|c| c.is_ascii_digit())
    }
}
