use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::core::{Aggregate, AggregateMeta};
use crate::models::{line_total, Currency};
use super::commands::IhaleCommand;
use super::errors::IhaleError;
use super::events::*;
use super::value_objects::{IhaleKalemi, IhaleStatus, Teklif, TeklifKalemi, TeklifStatus};

const REJECTED_ON_AWARD: &str = "Another bid was accepted";

// ============================================================================
// Ihale Aggregate - tender with its bids
// ============================================================================
//
// Bids live inside the tender so that "one open bid per supplier" and
// "accepting one bid rejects the rest" are checked against a single version.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ihale {
    pub meta: AggregateMeta,
    pub customer_firma_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<IhaleKalemi>,
    pub currency: Currency,
    pub deadline: DateTime<Utc>,
    pub status: IhaleStatus,
    pub bids: Vec<Teklif>,
    pub awarded_bid_id: Option<Uuid>,
    pub cancel_reason: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Ihale {
    pub fn bid(&self, teklif_id: Uuid) -> Option<&Teklif> {
        self.bids.iter().find(|b| b.id == teklif_id)
    }

    pub fn open_bid_of(&self, supplier_firma_id: Uuid) -> Option<&Teklif> {
        self.bids
            .iter()
            .find(|b| b.supplier_firma_id == supplier_firma_id && b.is_open())
    }

    pub fn awarded_bid(&self) -> Option<&Teklif> {
        self.awarded_bid_id.and_then(|id| self.bid(id))
    }

    /// Copy of the tender as a supplier may see it: only its own bids.
    pub fn redacted_for(&self, supplier_firma_id: Uuid) -> Ihale {
        let mut view = self.clone();
        view.bids.retain(|b| b.supplier_firma_id == supplier_firma_id);
        view
    }

    fn validate_items(items: &[IhaleKalemi]) -> Result<(), IhaleError> {
        if items.is_empty() {
            return Err(IhaleError::EmptyItems);
        }

        let mut seen = HashSet::new();
        for item in items {
            if !seen.insert(item.item_no) {
                return Err(IhaleError::DuplicateItemNo(item.item_no));
            }
            if item.quantity <= Decimal::ZERO {
                return Err(IhaleError::InvalidQuantity(item.item_no));
            }
        }

        Ok(())
    }

    /// Check that a bid prices every item exactly once and return its total.
    fn price_bid(&self, bid_items: &[TeklifKalemi]) -> Result<Decimal, IhaleError> {
        let mut seen = HashSet::new();
        let mut total = Decimal::ZERO;

        for line in bid_items {
            let item = self
                .items
                .iter()
                .find(|i| i.item_no == line.item_no)
                .ok_or(IhaleError::UnknownItem(line.item_no))?;

            if !seen.insert(line.item_no) {
                return Err(IhaleError::DuplicateItemNo(line.item_no));
            }
            if line.unit_price <= Decimal::ZERO {
                return Err(IhaleError::InvalidUnitPrice(line.item_no));
            }

            total = line_total(item.quantity, line.unit_price)
                .and_then(|amount| total.checked_add(amount))
                .ok_or(IhaleError::AmountOverflow(line.item_no))?;
        }

        if seen.len() != self.items.len() {
            return Err(IhaleError::IncompleteBid);
        }

        Ok(total)
    }

    fn open_bid(&self, teklif_id: Uuid) -> Result<&Teklif, IhaleError> {
        let bid = self.bid(teklif_id).ok_or(IhaleError::BidNotFound(teklif_id))?;
        if !bid.is_open() {
            return Err(IhaleError::BidNotOpen(bid.status));
        }
        Ok(bid)
    }

    fn require_status(&self, allowed: &[IhaleStatus]) -> Result<(), IhaleError> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(IhaleError::InvalidStatusTransition(self.status))
        }
    }

    fn reject_open_bids(&self, except: Option<Uuid>, reason: &str, at: DateTime<Utc>) -> Vec<IhaleEvent> {
        self.bids
            .iter()
            .filter(|b| b.is_open() && Some(b.id) != except)
            .map(|b| IhaleEvent::BidRejected {
                teklif_id: b.id,
                supplier_firma_id: b.supplier_firma_id,
                reason: reason.to_string(),
                at,
            })
            .collect()
    }

    fn bid_mut(&mut self, teklif_id: Uuid) -> Result<&mut Teklif, IhaleError> {
        self.bids
            .iter_mut()
            .find(|b| b.id == teklif_id)
            .ok_or(IhaleError::BidNotFound(teklif_id))
    }
}

impl Aggregate for Ihale {
    type Event = IhaleEvent;
    type Command = IhaleCommand;
    type Error = IhaleError;

    const AGGREGATE_TYPE: &'static str = "Ihale";

    fn handle_creation(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            IhaleCommand::Create { customer_firma_id, title, description, items, currency, deadline } => {
                if title.trim().is_empty() {
                    return Err(IhaleError::EmptyTitle);
                }
                Self::validate_items(items)?;

                Ok(vec![IhaleEvent::Created(IhaleCreated {
                    customer_firma_id: *customer_firma_id,
                    title: title.trim().to_string(),
                    description: description.clone(),
                    items: items.clone(),
                    currency: *currency,
                    deadline: *deadline,
                })])
            }
            _ => Err(IhaleError::NotInitialized),
        }
    }

    fn apply_first_event(meta: AggregateMeta, event: &Self::Event) -> Result<Self, Self::Error> {
        match event {
            IhaleEvent::Created(e) => Ok(Self {
                meta,
                customer_firma_id: e.customer_firma_id,
                title: e.title.clone(),
                description: e.description.clone(),
                items: e.items.clone(),
                currency: e.currency,
                deadline: e.deadline,
                status: IhaleStatus::Draft,
                bids: Vec::new(),
                awarded_bid_id: None,
                cancel_reason: None,
                published_at: None,
                closed_at: None,
            }),
            _ => Err(IhaleError::NotInitialized),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            IhaleEvent::Created(_) => {}
            IhaleEvent::DraftUpdated(e) => {
                if let Some(ref title) = e.title {
                    self.title = title.clone();
                }
                if let Some(ref description) = e.description {
                    self.description = Some(description.clone());
                }
                if let Some(ref items) = e.items {
                    self.items = items.clone();
                }
                if let Some(deadline) = e.deadline {
                    self.deadline = deadline;
                }
            }
            IhaleEvent::Published { at } => {
                self.status = IhaleStatus::Published;
                self.published_at = Some(*at);
            }
            IhaleEvent::BidSubmitted(teklif) => {
                self.bids.push(teklif.clone());
            }
            IhaleEvent::BidWithdrawn { teklif_id, at, .. } => {
                let bid = self.bid_mut(*teklif_id)?;
                bid.status = TeklifStatus::Withdrawn;
                bid.decided_at = Some(*at);
            }
            IhaleEvent::Closed { at } => {
                self.status = IhaleStatus::Closed;
                self.closed_at = Some(*at);
            }
            IhaleEvent::BidAccepted { teklif_id, at, .. } => {
                let bid = self.bid_mut(*teklif_id)?;
                bid.status = TeklifStatus::Accepted;
                bid.decided_at = Some(*at);
                self.status = IhaleStatus::Awarded;
                self.awarded_bid_id = Some(*teklif_id);
                self.closed_at.get_or_insert(*at);
            }
            IhaleEvent::BidRejected { teklif_id, reason, at, .. } => {
                let bid = self.bid_mut(*teklif_id)?;
                bid.status = TeklifStatus::Rejected;
                bid.reject_reason = Some(reason.clone());
                bid.decided_at = Some(*at);
            }
            IhaleEvent::Cancelled { reason, at } => {
                self.status = IhaleStatus::Cancelled;
                self.cancel_reason = Some(reason.clone());
                self.closed_at.get_or_insert(*at);
            }
            IhaleEvent::Deleted => {
                self.meta.is_deleted = true;
            }
        }
        Ok(())
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if self.meta.is_deleted {
            return Err(IhaleError::Deleted);
        }

        match command {
            IhaleCommand::Create { .. } => Err(IhaleError::InvalidStatusTransition(self.status)),

            IhaleCommand::UpdateDraft { title, description, items, deadline } => {
                self.require_status(&[IhaleStatus::Draft])?;
                if let Some(title) = title {
                    if title.trim().is_empty() {
                        return Err(IhaleError::EmptyTitle);
                    }
                }
                if let Some(items) = items {
                    Self::validate_items(items)?;
                }

                Ok(vec![IhaleEvent::DraftUpdated(IhaleDraftUpdated {
                    title: title.as_ref().map(|t| t.trim().to_string()),
                    description: description.clone(),
                    items: items.clone(),
                    deadline: *deadline,
                })])
            }

            IhaleCommand::Publish { at } => {
                self.require_status(&[IhaleStatus::Draft])?;
                if self.deadline <= *at {
                    return Err(IhaleError::DeadlineInPast(self.deadline));
                }
                Ok(vec![IhaleEvent::Published { at: *at }])
            }

            IhaleCommand::SubmitBid { teklif_id, supplier_firma_id, items, note, at } => {
                self.require_status(&[IhaleStatus::Published])?;
                if *at > self.deadline {
                    return Err(IhaleError::DeadlinePassed);
                }
                if *supplier_firma_id == self.customer_firma_id {
                    return Err(IhaleError::OwnTender);
                }
                if self.open_bid_of(*supplier_firma_id).is_some() {
                    return Err(IhaleError::DuplicateBid);
                }

                let total = self.price_bid(items)?;

                Ok(vec![IhaleEvent::BidSubmitted(Teklif {
                    id: *teklif_id,
                    supplier_firma_id: *supplier_firma_id,
                    items: items.clone(),
                    total,
                    note: note.clone(),
                    status: TeklifStatus::Submitted,
                    submitted_at: *at,
                    decided_at: None,
                    reject_reason: None,
                })])
            }

            IhaleCommand::WithdrawBid { teklif_id, supplier_firma_id, at } => {
                self.require_status(&[IhaleStatus::Published])?;
                let bid = self.open_bid(*teklif_id)?;
                if bid.supplier_firma_id != *supplier_firma_id {
                    return Err(IhaleError::NotBidOwner);
                }
                Ok(vec![IhaleEvent::BidWithdrawn {
                    teklif_id: *teklif_id,
                    supplier_firma_id: *supplier_firma_id,
                    at: *at,
                }])
            }

            IhaleCommand::Close { at } => {
                self.require_status(&[IhaleStatus::Published])?;
                Ok(vec![IhaleEvent::Closed { at: *at }])
            }

            IhaleCommand::AcceptBid { teklif_id, at } => {
                self.require_status(&[IhaleStatus::Published, IhaleStatus::Closed])?;
                let bid = self.open_bid(*teklif_id)?;

                let mut events = vec![IhaleEvent::BidAccepted {
                    teklif_id: bid.id,
                    supplier_firma_id: bid.supplier_firma_id,
                    at: *at,
                }];
                events.extend(self.reject_open_bids(Some(bid.id), REJECTED_ON_AWARD, *at));
                Ok(events)
            }

            IhaleCommand::RejectBid { teklif_id, reason, at } => {
                self.require_status(&[IhaleStatus::Published, IhaleStatus::Closed])?;
                let bid = self.open_bid(*teklif_id)?;
                Ok(vec![IhaleEvent::BidRejected {
                    teklif_id: bid.id,
                    supplier_firma_id: bid.supplier_firma_id,
                    reason: reason.clone(),
                    at: *at,
                }])
            }

            IhaleCommand::Cancel { reason, at } => {
                self.require_status(&[IhaleStatus::Draft, IhaleStatus::Published, IhaleStatus::Closed])?;
                let mut events = self.reject_open_bids(None, &format!("Tender cancelled: {}", reason), *at);
                events.push(IhaleEvent::Cancelled { reason: reason.clone(), at: *at });
                Ok(events)
            }

            IhaleCommand::Delete => {
                self.require_status(&[IhaleStatus::Draft, IhaleStatus::Cancelled])?;
                Ok(vec![IhaleEvent::Deleted])
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
        let mut parties = vec![self.customer_firma_id];
        for bid in &self.bids {
            if !parties.contains(&bid.supplier_firma_id) {
                parties.push(bid.supplier_firma_id);
            }
        }
        parties
    }

    fn empty_history_error() -> Self::Error {
        IhaleError::NotInitialized
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::models::Unit;

    fn items() -> Vec<IhaleKalemi> {
        vec![
            IhaleKalemi {
                item_no: 1,
                malzeme_id: None,
                description: "Celik profil 40x40".into(),
                quantity: Decimal::new(100, 0),
                unit: Unit::Metre,
            },
            IhaleKalemi {
                item_no: 2,
                malzeme_id: None,
                description: "Kaynak teli".into(),
                quantity: Decimal::new(20, 0),
                unit: Unit::Kg,
            },
        ]
    }

    fn draft(customer: Uuid, now: DateTime<Utc>) -> Ihale {
        let events = Ihale::handle_creation(&IhaleCommand::Create {
            customer_firma_id: customer,
            title: "Q3 celik alimi".into(),
            description: None,
            items: items(),
            currency: Currency::TRY,
            deadline: now + Duration::days(7),
        })
        .unwrap();
        Ihale::load_from_events(AggregateMeta::new(Uuid::new_v4(), None, now), &events).unwrap()
    }

    fn run(ihale: &mut Ihale, command: IhaleCommand) -> Result<Vec<IhaleEvent>, IhaleError> {
        let events = ihale.handle_command(&command)?;
        for event in &events {
            ihale.apply_event(event)?;
        }
        Ok(events)
    }

    fn full_bid() -> Vec<TeklifKalemi> {
        vec![
            TeklifKalemi { item_no: 1, unit_price: Decimal::new(1250, 2), lead_time_days: Some(5) },
            TeklifKalemi { item_no: 2, unit_price: Decimal::new(80, 0), lead_time_days: None },
        ]
    }

    fn published(now: DateTime<Utc>) -> Ihale {
        let mut ihale = draft(Uuid::new_v4(), now);
        run(&mut ihale, IhaleCommand::Publish { at: now }).unwrap();
        ihale
    }

    fn submit(ihale: &mut Ihale, supplier: Uuid, at: DateTime<Utc>) -> Result<Uuid, IhaleError> {
        let teklif_id = Uuid::new_v4();
        run(
            ihale,
            IhaleCommand::SubmitBid { teklif_id, supplier_firma_id: supplier, items: full_bid(), note: None, at },
        )?;
        Ok(teklif_id)
    }

    #[test]
    fn test_create_requires_items() {
        let result = Ihale::handle_creation(&IhaleCommand::Create {
            customer_firma_id: Uuid::new_v4(),
            title: "Bos".into(),
            description: None,
            items: vec![],
            currency: Currency::TRY,
            deadline: Utc::now(),
        });
        assert!(matches!(result, Err(IhaleError::EmptyItems)));
    }

    #[test]
    fn test_create_rejects_duplicate_item_numbers() {
        let mut duplicated = items();
        duplicated[1].item_no = 1;
        let result = Ihale::handle_creation(&IhaleCommand::Create {
            customer_firma_id: Uuid::new_v4(),
            title: "Ikili".into(),
            description: None,
            items: duplicated,
            currency: Currency::TRY,
            deadline: Utc::now(),
        });
        assert!(matches!(result, Err(IhaleError::DuplicateItemNo(1))));
    }

    #[test]
    fn test_publish_requires_future_deadline() {
        let now = Utc::now();
        let ihale = draft(Uuid::new_v4(), now);
        let late = now + Duration::days(30);
        assert!(matches!(
            ihale.handle_command(&IhaleCommand::Publish { at: late }),
            Err(IhaleError::DeadlineInPast(_))
        ));
    }

    #[test]
    fn test_draft_update_only_in_draft() {
        let now = Utc::now();
        let mut ihale = draft(Uuid::new_v4(), now);
        run(
            &mut ihale,
            IhaleCommand::UpdateDraft { title: Some("Yeni baslik".into()), description: None, items: None, deadline: None },
        )
        .unwrap();
        assert_eq!(ihale.title, "Yeni baslik");

        run(&mut ihale, IhaleCommand::Publish { at: now }).unwrap();
        let result = ihale.handle_command(&IhaleCommand::UpdateDraft {
            title: Some("Gec".into()),
            description: None,
            items: None,
            deadline: None,
        });
        assert!(matches!(result, Err(IhaleError::InvalidStatusTransition(IhaleStatus::Published))));
    }

    #[test]
    fn test_bid_total_is_computed() {
        let now = Utc::now();
        let mut ihale = published(now);
        let teklif_id = submit(&mut ihale, Uuid::new_v4(), now).unwrap();

        let bid = ihale.bid(teklif_id).unwrap();
        // 100 * 12.50 + 20 * 80
        assert_eq!(bid.total, Decimal::new(2850, 0));
        assert_eq!(bid.status, TeklifStatus::Submitted);
    }

    #[test]
    fn test_bid_on_draft_rejected() {
        let now = Utc::now();
        let mut ihale = draft(Uuid::new_v4(), now);
        assert!(matches!(
            submit(&mut ihale, Uuid::new_v4(), now),
            Err(IhaleError::InvalidStatusTransition(IhaleStatus::Draft))
        ));
    }

    #[test]
    fn test_bid_after_deadline_rejected() {
        let now = Utc::now();
        let mut ihale = published(now);
        let late = ihale.deadline + Duration::seconds(1);
        assert!(matches!(submit(&mut ihale, Uuid::new_v4(), late), Err(IhaleError::DeadlinePassed)));
    }

    #[test]
    fn test_owner_cannot_bid() {
        let now = Utc::now();
        let mut ihale = published(now);
        let owner = ihale.customer_firma_id;
        assert!(matches!(submit(&mut ihale, owner, now), Err(IhaleError::OwnTender)));
    }

    #[test]
    fn test_one_open_bid_per_supplier() {
        let now = Utc::now();
        let mut ihale = published(now);
        let supplier = Uuid::new_v4();
        let first = submit(&mut ihale, supplier, now).unwrap();
        assert!(matches!(submit(&mut ihale, supplier, now), Err(IhaleError::DuplicateBid)));

        run(&mut ihale, IhaleCommand::WithdrawBid { teklif_id: first, supplier_firma_id: supplier, at: now }).unwrap();
        assert_eq!(ihale.bid(first).unwrap().status, TeklifStatus::Withdrawn);
        assert!(submit(&mut ihale, supplier, now).is_ok());
    }

    #[test]
    fn test_incomplete_bid_rejected() {
        let now = Utc::now();
        let ihale = published(now);
        let result = ihale.handle_command(&IhaleCommand::SubmitBid {
            teklif_id: Uuid::new_v4(),
            supplier_firma_id: Uuid::new_v4(),
            items: vec![TeklifKalemi { item_no: 1, unit_price: Decimal::ONE, lead_time_days: None }],
            note: None,
            at: now,
        });
        assert!(matches!(result, Err(IhaleError::IncompleteBid)));
    }

    #[test]
    fn test_bid_with_unknown_item_or_zero_price_rejected() {
        let now = Utc::now();
        let ihale = published(now);

        let mut unknown = full_bid();
        unknown[1].item_no = 9;
        let result = ihale.handle_command(&IhaleCommand::SubmitBid {
            teklif_id: Uuid::new_v4(),
            supplier_firma_id: Uuid::new_v4(),
            items: unknown,
            note: None,
            at: now,
        });
        assert!(matches!(result, Err(IhaleError::UnknownItem(9))));

        let mut free = full_bid();
        free[0].unit_price = Decimal::ZERO;
        let result = ihale.handle_command(&IhaleCommand::SubmitBid {
            teklif_id: Uuid::new_v4(),
            supplier_firma_id: Uuid::new_v4(),
            items: free,
            note: None,
            at: now,
        });
        assert!(matches!(result, Err(IhaleError::InvalidUnitPrice(1))));
    }

    #[test]
    fn test_bid_total_overflow_is_rejected() {
        let now = Utc::now();
        let mut huge = items();
        huge[0].quantity = Decimal::MAX;
        let events = Ihale::handle_creation(&IhaleCommand::Create {
            customer_firma_id: Uuid::new_v4(),
            title: "Sinirsiz".into(),
            description: None,
            items: huge,
            currency: Currency::TRY,
            deadline: now + Duration::days(7),
        })
        .unwrap();
        let mut ihale = Ihale::load_from_events(AggregateMeta::new(Uuid::new_v4(), None, now), &events).unwrap();
        run(&mut ihale, IhaleCommand::Publish { at: now }).unwrap();

        let mut bid = full_bid();
        bid[0].unit_price = Decimal::TWO;
        let result = ihale.handle_command(&IhaleCommand::SubmitBid {
            teklif_id: Uuid::new_v4(),
            supplier_firma_id: Uuid::new_v4(),
            items: bid,
            note: None,
            at: now,
        });
        assert!(matches!(result, Err(IhaleError::AmountOverflow(1))));
    }

    #[test]
    fn test_withdraw_requires_bid_owner() {
        let now = Utc::now();
        let mut ihale = published(now);
        let teklif_id = submit(&mut ihale, Uuid::new_v4(), now).unwrap();
        let result = ihale.handle_command(&IhaleCommand::WithdrawBid {
            teklif_id,
            supplier_firma_id: Uuid::new_v4(),
            at: now,
        });
        assert!(matches!(result, Err(IhaleError::NotBidOwner)));
    }

    #[test]
    fn test_accept_bid_awards_and_rejects_others() {
        let now = Utc::now();
        let mut ihale = published(now);
        let winner = submit(&mut ihale, Uuid::new_v4(), now).unwrap();
        let loser = submit(&mut ihale, Uuid::new_v4(), now).unwrap();

        run(&mut ihale, IhaleCommand::Close { at: now }).unwrap();
        assert_eq!(ihale.status, IhaleStatus::Closed);

        let events = run(&mut ihale, IhaleCommand::AcceptBid { teklif_id: winner, at: now }).unwrap();
        assert_eq!(events.len(), 2);

        assert_eq!(ihale.status, IhaleStatus::Awarded);
        assert_eq!(ihale.awarded_bid_id, Some(winner));
        assert_eq!(ihale.bid(winner).unwrap().status, TeklifStatus::Accepted);
        let rejected = ihale.bid(loser).unwrap();
        assert_eq!(rejected.status, TeklifStatus::Rejected);
        assert_eq!(rejected.reject_reason.as_deref(), Some(REJECTED_ON_AWARD));

        assert!(matches!(
            ihale.handle_command(&IhaleCommand::AcceptBid { teklif_id: loser, at: now }),
            Err(IhaleError::InvalidStatusTransition(IhaleStatus::Awarded))
        ));
    }

    #[test]
    fn test_closed_tender_takes_no_bids() {
        let now = Utc::now();
        let mut ihale = published(now);
        run(&mut ihale, IhaleCommand::Close { at: now }).unwrap();
        assert!(matches!(
            submit(&mut ihale, Uuid::new_v4(), now),
            Err(IhaleError::InvalidStatusTransition(IhaleStatus::Closed))
        ));
    }

    #[test]
    fn test_reject_single_bid_keeps_tender_open() {
        let now = Utc::now();
        let mut ihale = published(now);
        let teklif_id = submit(&mut ihale, Uuid::new_v4(), now).unwrap();
        run(&mut ihale, IhaleCommand::RejectBid { teklif_id, reason: "too expensive".into(), at: now }).unwrap();

        assert_eq!(ihale.status, IhaleStatus::Published);
        assert_eq!(ihale.bid(teklif_id).unwrap().status, TeklifStatus::Rejected);
        assert!(matches!(
            ihale.handle_command(&IhaleCommand::RejectBid { teklif_id, reason: "again".into(), at: now }),
            Err(IhaleError::BidNotOpen(TeklifStatus::Rejected))
        ));
    }

    #[test]
    fn test_cancel_rejects_open_bids() {
        let now = Utc::now();
        let mut ihale = published(now);
        let teklif_id = submit(&mut ihale, Uuid::new_v4(), now).unwrap();

        let events = run(&mut ihale, IhaleCommand::Cancel { reason: "budget cut".into(), at: now }).unwrap();
        assert!(matches!(events.last(), Some(IhaleEvent::Cancelled { .. })));
        assert_eq!(ihale.status, IhaleStatus::Cancelled);
        assert_eq!(ihale.bid(teklif_id).unwrap().status, TeklifStatus::Rejected);
        assert_eq!(ihale.cancel_reason.as_deref(), Some("budget cut"));
    }

    #[test]
    fn test_delete_only_draft_or_cancelled() {
        let now = Utc::now();
        let mut ihale = published(now);
        assert!(matches!(
            ihale.handle_command(&IhaleCommand::Delete),
            Err(IhaleError::InvalidStatusTransition(IhaleStatus::Published))
        ));

        run(&mut ihale, IhaleCommand::Cancel { reason: "x".into(), at: now }).unwrap();
        run(&mut ihale, IhaleCommand::Delete).unwrap();
        assert!(ihale.is_deleted());
        assert!(matches!(ihale.handle_command(&IhaleCommand::Close { at: now }), Err(IhaleError::Deleted)));
    }

    #[test]
    fn test_parties_and_redaction() {
        let now = Utc::now();
        let mut ihale = published(now);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        submit(&mut ihale, a, now).unwrap();
        submit(&mut ihale, b, now).unwrap();

        let parties = ihale.parties();
        assert_eq!(parties.len(), 3);
        assert!(parties.contains(&a) && parties.contains(&b));

        let view = ihale.redacted_for(a);
        assert_eq!(view.bids.len(), 1);
        assert_eq!(view.bids[0].supplier_firma_id, a);
    }
}
