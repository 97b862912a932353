use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::value_objects::{IhaleStatus, TeklifStatus};

// ============================================================================
// Ihale Business Rule Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum IhaleError {
    #[error("Tender title cannot be empty")]
    EmptyTitle,

    #[error("Tender must have at least one item")]
    EmptyItems,

    #[error("Invalid quantity for item {0}")]
    InvalidQuantity(u32),

    #[error("Duplicate item number {0}")]
    DuplicateItemNo(u32),

    #[error("Deadline {0} is not in the future")]
    DeadlineInPast(DateTime<Utc>),

    #[error("Tender deadline has passed")]
    DeadlinePassed,

    #[error("Operation not allowed while tender is {0:?}")]
    InvalidStatusTransition(IhaleStatus),

    #[error("A firm cannot bid on its own tender")]
    OwnTender,

    #[error("Supplier already has an open bid on this tender")]
    DuplicateBid,

    #[error("Bid must price every tender item exactly once")]
    IncompleteBid,

    #[error("Bid references unknown item {0}")]
    UnknownItem(u32),

    #[error("Unit price for item {0} must be positive")]
    InvalidUnitPrice(u32),

    #[error("Amount for item {0} is too large")]
    AmountOverflow(u32),

    #[error("Bid not found: {0}")]
    BidNotFound(Uuid),

    #[error("Bid belongs to another supplier")]
    NotBidOwner,

    #[error("Bid is {0:?} and can no longer change")]
    BidNotOpen(TeklifStatus),

    #[error("Tender is deleted")]
    Deleted,

    #[error("Aggregate not initialized")]
    NotInitialized,
}
