use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// User Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Platform operator, not bound to a firm
    Admin,
    /// Manages the users of one firm
    FirmaAdmin,
    User,
}

impl Role {
    pub fn requires_firma(&self) -> bool {
        !matches!(self, Role::Admin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Active,
    Disabled,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Disabled => "Disabled",
        }
    }
}

/// The authenticated user a request or job acts on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: Uuid,
    pub firma_id: Option<Uuid>,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True for admins and for members of the given firm.
    pub fn can_access_firma(&self, firma_id: Uuid) -> bool {
        self.is_admin() || self.firma_id == Some(firma_id)
    }

    /// True for admins and for firm admins of the given firm.
    pub fn can_manage_firma(&self, firma_id: Uuid) -> bool {
        self.is_admin() || (self.role == Role::FirmaAdmin && self.firma_id == Some(firma_id))
    }
}
