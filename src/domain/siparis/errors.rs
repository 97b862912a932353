use rust_decimal::Decimal;

use super::value_objects::SiparisStatus;

// ============================================================================
// Siparis Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SiparisError {
    #[error("Order must have at least one item")]
    EmptyItems,

    #[error("Invalid quantity on line {0}")]
    InvalidQuantity(usize),

    #[error("Invalid unit price {1} on line {0}")]
    InvalidUnitPrice(usize, Decimal),

    #[error("Amount on line {0} is too large")]
    AmountOverflow(usize),

    #[error("Customer and supplier must be different firms")]
    SameParty,

    #[error("Waybill number is required")]
    MissingWaybill,

    #[error("Reason is required")]
    MissingReason,

    #[error("Cannot move order from {from:?} to {to:?}")]
    InvalidStatusTransition { from: SiparisStatus, to: SiparisStatus },

    #[error("Order can only be changed while {0:?}")]
    NotEditable(SiparisStatus),

    #[error("Order must be closed before it is deleted (currently {0:?})")]
    NotTerminal(SiparisStatus),

    #[error("Order is deleted")]
    Deleted,

    #[error("Aggregate not initialized")]
    NotInitialized,
}
