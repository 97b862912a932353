use super::value_objects::Role;

// ============================================================================
// User Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Full name cannot be empty")]
    EmptyName,

    #[error("Role {0:?} requires a firm")]
    FirmaRequired(Role),

    #[error("Admin users cannot belong to a firm")]
    AdminWithFirma,

    #[error("User already has role {0:?}")]
    SameRole(Role),

    #[error("User is already active")]
    AlreadyActive,

    #[error("User is already disabled")]
    AlreadyDisabled,

    #[error("User is deleted")]
    Deleted,

    #[error("Aggregate not initialized")]
    NotInitialized,
}
