use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::core::{Aggregate, AggregateMeta};
use crate::models::Currency;
use super::commands::SiparisCommand;
use super::errors::SiparisError;
use super::events::*;
use super::value_objects::{OrderNumber, Shipment, SiparisKalemi, SiparisSource, SiparisStatus};

// ============================================================================
// Siparis Aggregate
// ============================================================================
//
//   Created ──confirm──► Confirmed ──ship──► Shipped ──deliver──► Delivered
//      │  └──reject──► Rejected        │
//      └──────cancel───────────────────┴──► Cancelled
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Siparis {
    pub meta: AggregateMeta,
    pub order_no: OrderNumber,
    pub customer_firma_id: Uuid,
    pub supplier_firma_id: Uuid,
    pub source: Option<SiparisSource>,
    pub items: Vec<SiparisKalemi>,
    pub currency: Currency,
    pub delivery_address: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
    pub note: Option<String>,
    pub status: SiparisStatus,
    pub shipment: Option<Shipment>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub reject_reason: Option<String>,
}

impl Siparis {
    /// Sum of the line totals. Creation rejects item lists whose total overflows.
    pub fn total(&self) -> Option<Decimal> {
        self.items.iter().try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.total()?))
    }

    pub fn is_customer(&self, firma_id: Uuid) -> bool {
        self.customer_firma_id == firma_id
    }

    pub fn is_supplier(&self, firma_id: Uuid) -> bool {
        self.supplier_firma_id == firma_id
    }

    fn validate_items(items: &[SiparisKalemi]) -> Result<(), SiparisError> {
        if items.is_empty() {
            return Err(SiparisError::EmptyItems);
        }

        let mut total = Decimal::ZERO;
        for (index, item) in items.iter().enumerate() {
            let line = index + 1;
            if item.quantity <= Decimal::ZERO {
                return Err(SiparisError::InvalidQuantity(line));
            }
            if item.unit_price < Decimal::ZERO {
                return Err(SiparisError::InvalidUnitPrice(line, item.unit_price));
            }
            total = item
                .total()
                .and_then(|amount| total.checked_add(amount))
                .ok_or(SiparisError::AmountOverflow(line))?;
        }

        Ok(())
    }

    fn transition(&self, from: &[SiparisStatus], to: SiparisStatus) -> Result<(), SiparisError> {
        if from.contains(&self.status) {
            Ok(())
        } else {
            Err(SiparisError::InvalidStatusTransition { from: self.status, to })
        }
    }

    fn require_reason(reason: &str) -> Result<String, SiparisError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(SiparisError::MissingReason);
        }
        Ok(reason.to_string())
    }
}

impl Aggregate for Siparis {
    type Event = SiparisEvent;
    type Command = SiparisCommand;
    type Error = SiparisError;

    const AGGREGATE_TYPE: &'static str = "Siparis";

    fn handle_creation(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SiparisCommand::Create {
                order_no,
                customer_firma_id,
                supplier_firma_id,
                source,
                items,
                currency,
                delivery_address,
                requested_delivery_date,
                note,
            } => {
                if customer_firma_id == supplier_firma_id {
                    return Err(SiparisError::SameParty);
                }
                Self::validate_items(items)?;

                Ok(vec![SiparisEvent::Created(SiparisCreated {
                    order_no: order_no.clone(),
                    customer_firma_id: *customer_firma_id,
                    supplier_firma_id: *supplier_firma_id,
                    source: *source,
                    items: items.clone(),
                    currency: *currency,
                    delivery_address: delivery_address.clone(),
                    requested_delivery_date: *requested_delivery_date,
                    note: note.clone(),
                })])
            }
            _ => Err(SiparisError::NotInitialized),
        }
    }

    fn apply_first_event(meta: AggregateMeta, event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            SiparisEvent::Created(e) => Ok(Self {
                meta,
                order_no: e.order_no.clone(),
                customer_firma_id: e.customer_firma_id,
                supplier_firma_id: e.supplier_firma_id,
                source: e.source,
                items: e.items.clone(),
                currency: e.currency,
                delivery_address: e.delivery_address.clone(),
                requested_delivery_date: e.requested_delivery_date,
                note: e.note.clone(),
                status: SiparisStatus::Created,
                shipment: None,
                confirmed_at: None,
                delivered_at: None,
                cancel_reason: None,
                reject_reason: None,
            }),
            _ => Err(SiparisError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            SiparisEvent::Created(_) => {}
            SiparisEvent::ItemsUpdated { items } => self.items = items.clone(),
            SiparisEvent::Confirmed { at } => {
                self.status = SiparisStatus::Confirmed;
                self.confirmed_at = Some(*at);
            }
            SiparisEvent::Rejected { reason } => {
                self.status = SiparisStatus::Rejected;
                self.reject_reason = Some(reason.clone());
            }
            SiparisEvent::Shipped(shipment) => {
                self.status = SiparisStatus::Shipped;
                self.shipment = Some(shipment.clone());
            }
            SiparisEvent::Delivered { at } => {
                self.status = SiparisStatus::Delivered;
                self.delivered_at = Some(*at);
            }
            SiparisEvent::Cancelled { reason } => {
                self.status = SiparisStatus::Cancelled;
                self.cancel_reason = Some(reason.clone());
            }
            SiparisEvent::Deleted => self.meta.is_deleted = true,
        }
        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if self.meta.is_deleted {
            return Err(SiparisError::Deleted);
        }

        match command {
            SiparisCommand::Create { .. } => Err(SiparisError::NotEditable(self.status)),

            SiparisCommand::UpdateItems { items } => {
                if self.status != SiparisStatus::Created {
                    return Err(SiparisError::NotEditable(self.status));
                }
                Self::validate_items(items)?;
                Ok(vec![SiparisEvent::ItemsUpdated { items: items.clone() }])
            }

            SiparisCommand::Confirm { at } => {
                self.transition(&[SiparisStatus::Created], SiparisStatus::Confirmed)?;
                Ok(vec![SiparisEvent::Confirmed { at: *at }])
            }

            SiparisCommand::Reject { reason } => {
                self.transition(&[SiparisStatus::Created], SiparisStatus::Rejected)?;
                let reason = Self::require_reason(reason)?;
                Ok(vec![SiparisEvent::Rejected { reason }])
            }

            SiparisCommand::Ship { waybill_no, carrier, at } => {
                self.transition(&[SiparisStatus::Confirmed], SiparisStatus::Shipped)?;
                if waybill_no.trim().is_empty() {
                    return Err(SiparisError::MissingWaybill);
                }
                Ok(vec![SiparisEvent::Shipped(Shipment {
                    waybill_no: waybill_no.trim().to_string(),
                    carrier: carrier.clone(),
                    shipped_at: *at,
                })])
            }

            SiparisCommand::Deliver { at } => {
                self.transition(&[SiparisStatus::Shipped], SiparisStatus::Delivered)?;
                Ok(vec![SiparisEvent::Delivered { at: *at }])
            }

            SiparisCommand::Cancel { reason } => {
                self.transition(
                    &[SiparisStatus::Created, SiparisStatus::Confirmed],
                    SiparisStatus::Cancelled,
                )?;
                let reason = Self::require_reason(reason)?;
                Ok(vec![SiparisEvent::Cancelled { reason }])
            }

            SiparisCommand::Delete => {
                if !self.status.is_terminal() {
                    return Err(SiparisError::NotTerminal(self.status));
                }
                Ok(vec![SiparisEvent::Deleted])
            }
        }
    }

    fn command_name(command: &Self::Command) -> &'static str {
        command.name()
    }

    fn meta(&self) -> &AggregateMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut AggregateMeta {
        &mut self.meta
    }

    fn status_label(&self) -> &'static str {
        self.status.as_str()
    }

    fn owner_firma_id(&self) -> Option<Uuid> {
        Some(self.customer_firma_id)
    }

    fn parties(&self) -> Vec<Uuid> {
        vec![self.customer_firma_id, self.supplier_firma_id]
    }

    fn unique_keys(&self) -> Vec<String> {
        let mut keys = vec![self.order_no.unique_key()];
        if let Some(source) = self.source {
            keys.push(format!("order_source:{}", source.teklif_id));
        }
        keys
    }

    fn empty_history_error() -> Self::Error {
        SiparisError::NotInitialized
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Unit;

    fn item(quantity: i64, price: i64) -> SiparisKalemi {
        SiparisKalemi {
            malzeme_id: None,
            description: "Rulman 6204".into(),
            quantity: Decimal::new(quantity, 0),
            unit: Unit::Piece,
            unit_price: Decimal::new(price, 0),
        }
    }

    fn create_command(items: Vec<SiparisKalemi>) -> SiparisCommand {
        let id = Uuid::new_v4();
        SiparisCommand::Create {
            order_no: OrderNumber::generate(id, Utc::now().date_naive()),
            customer_firma_id: Uuid::new_v4(),
            supplier_firma_id: Uuid::new_v4(),
            source: None,
            items,
            currency: Currency::TRY,
            delivery_address: Some("Gebze OSB".into()),
            requested_delivery_date: None,
            note: None,
        }
    }

    fn created() -> Siparis {
        let events = Siparis::handle_creation(&create_command(vec![item(10, 45), item(2, 100)])).unwrap();
        Siparis::load_from_events(AggregateMeta::new(Uuid::new_v4(), None, Utc::now()), &events).unwrap()
    }

    fn run(siparis: &mut Siparis, command: SiparisCommand) -> Result<(), SiparisError> {
        for event in siparis.handle_command(&command)? {
            siparis.apply_event(&event)?;
        }
        Ok(())
    }

    fn ship(siparis: &mut Siparis) -> Result<(), SiparisError> {
        run(
            siparis,
            SiparisCommand::Ship { waybill_no: "IRS-001".into(), carrier: Some("Aras".into()), at: Utc::now() },
        )
    }

    #[test]
    fn test_create_order() {
        let siparis = created();
        assert_eq!(siparis.status, SiparisStatus::Created);
        assert_eq!(siparis.total(), Some(Decimal::new(650, 0)));
        assert_eq!(siparis.parties().len(), 2);
        assert!(siparis.unique_keys()[0].starts_with("order_no:SIP-"));
    }

    #[test]
    fn test_create_validation() {
        assert!(matches!(Siparis::handle_creation(&create_command(vec![])), Err(SiparisError::EmptyItems)));
        assert!(matches!(
            Siparis::handle_creation(&create_command(vec![item(1, 1), item(0, 1)])),
            Err(SiparisError::InvalidQuantity(2))
        ));
        assert!(matches!(
            Siparis::handle_creation(&create_command(vec![item(1, -5)])),
            Err(SiparisError::InvalidUnitPrice(1, _))
        ));
    }

    #[test]
    fn test_create_rejects_overflowing_amounts() {
        let mut huge = item(1, 2);
        huge.quantity = Decimal::MAX;
        assert!(matches!(
            Siparis::handle_creation(&create_command(vec![item(1, 1), huge.clone()])),
            Err(SiparisError::AmountOverflow(2))
        ));

        let mut at_limit = item(1, 1);
        at_limit.quantity = Decimal::MAX;
        assert!(matches!(
            Siparis::handle_creation(&create_command(vec![at_limit.clone(), at_limit])),
            Err(SiparisError::AmountOverflow(2))
        ));
    }

    #[test]
    fn test_customer_cannot_order_from_itself() {
        let firma = Uuid::new_v4();
        let command = SiparisCommand::Create {
            order_no: OrderNumber::generate(Uuid::new_v4(), Utc::now().date_naive()),
            customer_firma_id: firma,
            supplier_firma_id: firma,
            source: None,
            items: vec![item(1, 1)],
            currency: Currency::TRY,
            delivery_address: None,
            requested_delivery_date: None,
            note: None,
        };
        assert!(matches!(Siparis::handle_creation(&command), Err(SiparisError::SameParty)));
    }

    #[test]
    fn test_happy_path_to_delivery() {
        let mut siparis = created();
        run(&mut siparis, SiparisCommand::Confirm { at: Utc::now() }).unwrap();
        assert!(siparis.confirmed_at.is_some());

        ship(&mut siparis).unwrap();
        assert_eq!(siparis.shipment.as_ref().unwrap().waybill_no, "IRS-001");

        run(&mut siparis, SiparisCommand::Deliver { at: Utc::now() }).unwrap();
        assert_eq!(siparis.status, SiparisStatus::Delivered);
        assert!(siparis.delivered_at.is_some());
    }

    #[test]
    fn test_cannot_ship_unconfirmed_order() {
        let mut siparis = created();
        assert!(matches!(
            ship(&mut siparis),
            Err(SiparisError::InvalidStatusTransition { from: SiparisStatus::Created, to: SiparisStatus::Shipped })
        ));
    }

    #[test]
    fn test_ship_requires_waybill() {
        let mut siparis = created();
        run(&mut siparis, SiparisCommand::Confirm { at: Utc::now() }).unwrap();
        let result = siparis.handle_command(&SiparisCommand::Ship {
            waybill_no: "  ".into(),
            carrier: None,
            at: Utc::now(),
        });
        assert!(matches!(result, Err(SiparisError::MissingWaybill)));
    }

    #[test]
    fn test_reject_requires_reason() {
        let mut siparis = created();
        assert!(matches!(
            siparis.handle_command(&SiparisCommand::Reject { reason: " ".into() }),
            Err(SiparisError::MissingReason)
        ));
        run(&mut siparis, SiparisCommand::Reject { reason: "no stock".into() }).unwrap();
        assert_eq!(siparis.status, SiparisStatus::Rejected);
        assert_eq!(siparis.reject_reason.as_deref(), Some("no stock"));
    }

    #[test]
    fn test_cancel_after_shipping_rejected() {
        let mut siparis = created();
        run(&mut siparis, SiparisCommand::Confirm { at: Utc::now() }).unwrap();
        ship(&mut siparis).unwrap();
        assert!(matches!(
            siparis.handle_command(&SiparisCommand::Cancel { reason: "late".into() }),
            Err(SiparisError::InvalidStatusTransition { from: SiparisStatus::Shipped, .. })
        ));
    }

    #[test]
    fn test_items_editable_only_when_created() {
        let mut siparis = created();
        run(&mut siparis, SiparisCommand::UpdateItems { items: vec![item(3, 10)] }).unwrap();
        assert_eq!(siparis.total(), Some(Decimal::new(30, 0)));

        run(&mut siparis, SiparisCommand::Confirm { at: Utc::now() }).unwrap();
        assert!(matches!(
            siparis.handle_command(&SiparisCommand::UpdateItems { items: vec![item(1, 1)] }),
            Err(SiparisError::NotEditable(SiparisStatus::Confirmed))
        ));
    }

    #[test]
    fn test_delete_only_terminal_orders() {
        let mut siparis = created();
        assert!(matches!(
            siparis.handle_command(&SiparisCommand::Delete),
            Err(SiparisError::NotTerminal(SiparisStatus::Created))
        ));

        run(&mut siparis, SiparisCommand::Cancel { reason: "duplicate".into() }).unwrap();
        run(&mut siparis, SiparisCommand::Delete).unwrap();
        assert!(siparis.is_deleted());
        assert!(matches!(siparis.handle_command(&SiparisCommand::Delete), Err(SiparisError::Deleted)));
    }
}
