use rust_decimal::Decimal;

// ============================================================================
// Malzeme Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MalzemeError {
    #[error("Material code cannot be empty")]
    EmptyCode,

    #[error("Material name cannot be empty")]
    EmptyName,

    #[error("Unit price cannot be negative: {0}")]
    NegativePrice(Decimal),

    #[error("Material is already active")]
    AlreadyActive,

    #[error("Material is already inactive")]
    AlreadyInactive,

    #[error("Material is deleted")]
    Deleted,

    #[error("Aggregate not initialized")]
    NotInitialized,
}
