use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{line_total, Unit};

// ============================================================================
// Siparis Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiparisStatus {
    Created,
    Confirmed,
    Rejected,
    Shipped,
    Delivered,
    Cancelled,
}

impl SiparisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiparisStatus::Created => "Created",
            SiparisStatus::Confirmed => "Confirmed",
            SiparisStatus::Rejected => "Rejected",
            SiparisStatus::Shipped => "Shipped",
            SiparisStatus::Delivered => "Delivered",
            SiparisStatus::Cancelled => "Cancelled",
        }
    }

    /// No further transitions are possible from a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SiparisStatus::Rejected | SiparisStatus::Delivered | SiparisStatus::Cancelled
        )
    }
}

/// Order number in the form `SIP-YYYYMMDD-XXXXXXXX`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Derived from the order date and the last eight hex digits of its id.
    /// For v7 ids those come from the random tail, not the timestamp.
    pub fn generate(order_id: Uuid, date: NaiveDate) -> Self {
        let simple = order_id.simple().to_string().to_uppercase();
        Self(format!("SIP-{}-{}", date.format("%Y%m%d"), &simple[simple.len() - 8..]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn unique_key(&self) -> String {
        format!("order_no:{}", self.0)
    }
}

impl std::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiparisKalemi {
    pub malzeme_id: Option<Uuid>,
    pub description: String,
    pub quantity: Decimal,
    pub unit: Unit,
    pub unit_price: Decimal,
}

impl SiparisKalemi {
    pub fn total(&self) -> Option<Decimal> {
        line_total(self.quantity, self.unit_price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub waybill_no: String,
    pub carrier: Option<String>,
    pub shipped_at: DateTime<Utc>,
}

/// Tender and bid an order was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiparisSource {
    pub ihale_id: Uuid,
    pub teklif_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        let id = Uuid::parse_str("a1b2c3d4-0000-4000-8000-00000e5f6a7b").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(OrderNumber::generate(id, date).as_str(), "SIP-20240309-0E5F6A7B");
    }

    #[test]
    fn test_order_numbers_differ_within_the_same_millisecond() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let first = OrderNumber::generate(Uuid::now_v7(), date);
        let second = OrderNumber::generate(Uuid::now_v7(), date);
        assert_ne!(first, second);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(SiparisStatus::Delivered.is_terminal());
        assert!(SiparisStatus::Rejected.is_terminal());
        assert!(SiparisStatus::Cancelled.is_terminal());
        assert!(!SiparisStatus::Shipped.is_terminal());
    }

    #[test]
    fn test_item_total() {
        let item = SiparisKalemi {
            malzeme_id: None,
            description: "Eldiven".into(),
            quantity: Decimal::new(12, 0),
            unit: Unit::Package,
            unit_price: Decimal::new(1550, 2),
        };
        assert_eq!(item.total(), Some(Decimal::new(186, 0)));
    }
}
