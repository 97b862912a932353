use super::value_objects::FirmaStatus;

// ============================================================================
// Firma Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FirmaError {
    #[error("Firm name cannot be empty")]
    EmptyName,

    #[error("Invalid tax number: {0}")]
    InvalidTaxNumber(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Firm is already approved")]
    AlreadyApproved,

    #[error("Firm must be active to be deactivated")]
    NotActive,

    #[error("Firm must be passive to be activated")]
    NotPassive,

    #[error("Invalid firm status for this operation: {0:?}")]
    InvalidStatusTransition(FirmaStatus),

    #[error("Firm is deleted")]
    Deleted,

    #[error("Aggregate not initialized")]
    NotInitialized,
}
