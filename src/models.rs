use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Shared Value Objects
// ============================================================================
//
// Units, currencies and simple checks used by more than one aggregate.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    TRY,
    USD,
    EUR,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Unit {
    #[default]
    Piece,
    Kg,
    Litre,
    Metre,
    SquareMetre,
    Package,
    Box,
}

/// Basic email check: one `@` with text on both sides and a dot in the domain.
pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        _ => false,
    }
}

/// Line total, `quantity * unit_price`; `None` when it does not fit in a `Decimal`.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Option<Decimal> {
    quantity.checked_mul(unit_price)
}
