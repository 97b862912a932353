use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::ihale::{Ihale, IhaleCommand, IhaleKalemi, IhaleStatus, TeklifKalemi};
use crate::domain::siparis::Siparis;
use crate::domain::user::Caller;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::Metrics;
use crate::models::Currency;
use crate::store::{AggregateStore, ListQuery};
use super::command_handler::CommandHandler;
use super::firma::FirmaService;
use super::siparis::SiparisService;

// ============================================================================
// Ihale Service - tenders and the bids placed on them
// ============================================================================
//
// The owning customer sees every bid. Suppliers see published tenders and
// only their own bids on them.
//
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIhaleRequest {
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<IhaleKalemi>,
    #[serde(default)]
    pub currency: Currency,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIhaleRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub items: Option<Vec<IhaleKalemi>>,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitBidRequest {
    pub items: Vec<TeklifKalemi>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcceptBidRequest {
    #[serde(default)]
    pub create_order: bool,
    pub delivery_address: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
}

/// Delivery details for ordering the awarded bid after the fact.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderAwardRequest {
    pub delivery_address: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
}

/// The award always stands once returned; `order_error` explains a missing order.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptBidResult {
    pub ihale: Ihale,
    pub siparis: Option<Siparis>,
    pub order_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IhaleScope {
    /// Tenders raised by the caller's firm
    #[default]
    Own,
    /// Published tenders open for bidding
    Open,
    /// Tenders the caller's firm has bid on
    Participating,
}

#[derive(Clone)]
pub struct IhaleService {
    handler: CommandHandler<Ihale>,
    firmalar: FirmaService,
    siparisler: SiparisService,
}

impl IhaleService {
    pub fn new(
        store: Arc<dyn AggregateStore<Ihale>>,
        firmalar: FirmaService,
        siparisler: SiparisService,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { handler: CommandHandler::new(store, metrics), firmalar, siparisler }
    }

    pub async fn create(&self, caller: &Caller, request: CreateIhaleRequest) -> ServiceResult<Ihale> {
        let firma = self.firmalar.active_firma_of(caller).await?;
        if !firma.firma_type.is_customer() {
            return Err(ServiceError::BusinessRule("Only customer firms can raise tenders".into()));
        }

        let command = IhaleCommand::Create {
            customer_firma_id: firma.meta.id,
            title: request.title,
            description: request.description,
            items: request.items,
            currency: request.currency,
            deadline: request.deadline,
        };
        self.handler.create(Some(caller), Uuid::now_v7(), command).await
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> ServiceResult<Ihale> {
        let ihale = self.handler.load(id).await?;
        Self::view_for(caller, ihale).ok_or_else(|| ServiceError::not_found("Ihale", id))
    }

    pub async fn list(
        &self,
        caller: &Caller,
        scope: IhaleScope,
        status: Option<IhaleStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Vec<Ihale>> {
        let firma_id = caller.firma_id;
        let mut query = match (scope, firma_id) {
            (IhaleScope::Open, _) => ListQuery::default().with_status(IhaleStatus::Published.as_str()),
            (_, None) if caller.is_admin() => ListQuery::default(),
            (_, None) => return Err(ServiceError::forbidden("This action requires a firm account")),
            (IhaleScope::Own, Some(firma_id)) => ListQuery::owned_by(firma_id),
            (IhaleScope::Participating, Some(firma_id)) => ListQuery::involving(firma_id),
        };
        if let Some(status) = status {
            if scope != IhaleScope::Open {
                query = query.with_status(status.as_str());
            }
        }

        let tenders = self.handler.list(&query.page(limit, offset)).await?;
        Ok(tenders
            .into_iter()
            .filter(|ihale| scope != IhaleScope::Participating || Some(ihale.customer_firma_id) != firma_id)
            .filter_map(|ihale| Self::view_for(caller, ihale))
            .collect())
    }

    pub async fn update_draft(&self, caller: &Caller, id: Uuid, request: UpdateIhaleRequest) -> ServiceResult<Ihale> {
        let command = IhaleCommand::UpdateDraft {
            title: request.title,
            description: request.description,
            items: request.items,
            deadline: request.deadline,
        };
        self.owner_command(caller, id, command).await
    }

    pub async fn publish(&self, caller: &Caller, id: Uuid) -> ServiceResult<Ihale> {
        self.owner_command(caller, id, IhaleCommand::Publish { at: Utc::now() }).await
    }

    pub async fn close(&self, caller: &Caller, id: Uuid) -> ServiceResult<Ihale> {
        self.owner_command(caller, id, IhaleCommand::Close { at: Utc::now() }).await
    }

    pub async fn cancel(&self, caller: &Caller, id: Uuid, reason: String) -> ServiceResult<Ihale> {
        self.owner_command(caller, id, IhaleCommand::Cancel { reason, at: Utc::now() }).await
    }

    pub async fn delete(&self, caller: &Caller, id: Uuid) -> ServiceResult<Ihale> {
        self.owner_command(caller, id, IhaleCommand::Delete).await
    }

    pub async fn submit_bid(&self, caller: &Caller, id: Uuid, request: SubmitBidRequest) -> ServiceResult<Ihale> {
        let firma = self.firmalar.active_firma_of(caller).await?;
        if !firma.firma_type.is_supplier() {
            return Err(ServiceError::BusinessRule("Only supplier firms can bid".into()));
        }

        let ihale = self.load_visible(caller, id).await?;

        let command = IhaleCommand::SubmitBid {
            teklif_id: Uuid::now_v7(),
            supplier_firma_id: firma.meta.id,
            items: request.items,
            note: request.note,
            at: Utc::now(),
        };
        let ihale = self.handler.execute(Some(caller), ihale, command).await?;
        Ok(ihale.redacted_for(firma.meta.id))
    }

    pub async fn withdraw_bid(&self, caller: &Caller, id: Uuid, teklif_id: Uuid) -> ServiceResult<Ihale> {
        let firma_id = caller
            .firma_id
            .ok_or_else(|| ServiceError::forbidden("This action requires a firm account"))?;
        let ihale = self.load_visible(caller, id).await?;

        let command = IhaleCommand::WithdrawBid { teklif_id, supplier_firma_id: firma_id, at: Utc::now() };
        let ihale = self.handler.execute(Some(caller), ihale, command).await?;
        Ok(ihale.redacted_for(firma_id))
    }

    /// Award the tender; optionally order the winning bid straight away.
    ///
    /// The supplier is checked before the award so a doomed order does not
    /// leave the tender awarded. Should the order still fail afterwards the
    /// award is returned with `order_error`, and `order_award` can retry it.
    pub async fn accept_bid(
        &self,
        caller: &Caller,
        id: Uuid,
        teklif_id: Uuid,
        request: AcceptBidRequest,
    ) -> ServiceResult<AcceptBidResult> {
        let ihale = self.owned(caller, id).await?;
        if request.create_order {
            if let Some(bid) = ihale.bid(teklif_id) {
                self.siparisler.require_supplier(bid.supplier_firma_id).await?;
            }
        }

        let command = IhaleCommand::AcceptBid { teklif_id, at: Utc::now() };
        let ihale = self.handler.execute(Some(caller), ihale, command).await?;
        if !request.create_order {
            return Ok(AcceptBidResult { ihale, siparis: None, order_error: None });
        }

        let ordered = self
            .siparisler
            .create_from_bid(caller, &ihale, teklif_id, request.delivery_address, request.requested_delivery_date)
            .await;
        match ordered {
            Ok(siparis) => {
                tracing::info!(
                    ihale_id = %ihale.meta.id,
                    teklif_id = %teklif_id,
                    siparis_id = %siparis.meta.id,
                    order_no = %siparis.order_no,
                    "Order created from awarded bid"
                );
                Ok(AcceptBidResult { ihale, siparis: Some(siparis), order_error: None })
            }
            Err(e) => {
                tracing::warn!(ihale_id = %ihale.meta.id, teklif_id = %teklif_id, error = %e, "Bid awarded but order failed");
                Ok(AcceptBidResult { ihale, siparis: None, order_error: Some(e.to_string()) })
            }
        }
    }

    /// Order the awarded bid of a tender that was awarded without one.
    pub async fn order_award(&self, caller: &Caller, id: Uuid, request: OrderAwardRequest) -> ServiceResult<Siparis> {
        let ihale = self.owned(caller, id).await?;
        let teklif_id = ihale
            .awarded_bid()
            .map(|bid| bid.id)
            .ok_or_else(|| ServiceError::BusinessRule(format!("Ihale {} has no awarded bid", id)))?;
        self.siparisler
            .create_from_bid(caller, &ihale, teklif_id, request.delivery_address, request.requested_delivery_date)
            .await
    }

    pub async fn reject_bid(&self, caller: &Caller, id: Uuid, teklif_id: Uuid, reason: String) -> ServiceResult<Ihale> {
        self.owner_command(caller, id, IhaleCommand::RejectBid { teklif_id, reason, at: Utc::now() })
            .await
    }

    async fn owner_command(&self, caller: &Caller, id: Uuid, command: IhaleCommand) -> ServiceResult<Ihale> {
        let ihale = self.owned(caller, id).await?;
        self.handler.execute(Some(caller), ihale, command).await
    }

    async fn owned(&self, caller: &Caller, id: Uuid) -> ServiceResult<Ihale> {
        let ihale = self.load_visible(caller, id).await?;
        if !caller.can_access_firma(ihale.customer_firma_id) {
            return Err(ServiceError::forbidden("Only the tender owner can do this"));
        }
        Ok(ihale)
    }

    /// Full tender for commands; hidden tenders are reported as missing.
    async fn load_visible(&self, caller: &Caller, id: Uuid) -> ServiceResult<Ihale> {
        let ihale = self.handler.load(id).await?;
        if Self::is_visible(caller, &ihale) {
            Ok(ihale)
        } else {
            Err(ServiceError::not_found("Ihale", id))
        }
    }

    fn is_visible(caller: &Caller, ihale: &Ihale) -> bool {
        if caller.can_access_firma(ihale.customer_firma_id) {
            return true;
        }
        match caller.firma_id {
            Some(firma_id) => {
                ihale.status == IhaleStatus::Published || ihale.bids.iter().any(|bid| bid.supplier_firma_id == firma_id)
            }
            None => false,
        }
    }

    /// The tender as this caller may see it, or None when hidden.
    fn view_for(caller: &Caller, ihale: Ihale) -> Option<Ihale> {
        if !Self::is_visible(caller, &ihale) {
            return None;
        }
        match caller.firma_id {
            Some(firma_id) if !caller.can_access_firma(ihale.customer_firma_id) => Some(ihale.redacted_for(firma_id)),
            _ => Some(ihale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::firma::FirmaType;
    use crate::domain::ihale::TeklifStatus;
    use crate::domain::siparis::SiparisStatus;
    use crate::domain::user::User;
    use crate::models::Unit;
    use crate::services::tests::{admin, approved_firma_of_type, services};
    use crate::services::Services;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn tender() -> CreateIhaleRequest {
        CreateIhaleRequest {
            title: "2025 eldiven alimi".into(),
            description: None,
            items: vec![
                IhaleKalemi {
                    item_no: 1,
                    malzeme_id: None,
                    description: "Nitril eldiven".into(),
                    quantity: Decimal::new(100, 0),
                    unit: Unit::Box,
                },
                IhaleKalemi {
                    item_no: 2,
                    malzeme_id: None,
                    description: "Is eldiveni".into(),
                    quantity: Decimal::new(50, 0),
                    unit: Unit::Package,
                },
            ],
            currency: Currency::TRY,
            deadline: Utc::now() + Duration::days(7),
        }
    }

    fn bid(first: i64, second: i64) -> SubmitBidRequest {
        SubmitBidRequest {
            items: vec![
                TeklifKalemi { item_no: 1, unit_price: Decimal::new(first, 0), lead_time_days: Some(5) },
                TeklifKalemi { item_no: 2, unit_price: Decimal::new(second, 0), lead_time_days: None },
            ],
            note: None,
        }
    }

    struct Parties {
        buyer: User,
        seller_a: User,
        seller_b: User,
    }

    async fn parties(services: &Services) -> Parties {
        let (_, buyer) = approved_firma_of_type(services, "1111111111", "a@musteri.com", FirmaType::Customer).await;
        let (_, seller_a) = approved_firma_of_type(services, "2222222222", "a@tedarik.com", FirmaType::Supplier).await;
        let (_, seller_b) = approved_firma_of_type(services, "3333333333", "b@tedarik.com", FirmaType::Both).await;
        Parties { buyer, seller_a, seller_b }
    }

    async fn published(services: &Services, buyer: &Caller) -> Ihale {
        let ihale = services.ihaleler.create(buyer, tender()).await.unwrap();
        services.ihaleler.publish(buyer, ihale.meta.id).await.unwrap()
    }

    #[tokio::test]
    async fn test_award_with_order() {
        let services = services();
        let p = parties(&services).await;
        let buyer = p.buyer.as_caller();
        let ihale = published(&services, &buyer).await;

        let a = services.ihaleler.submit_bid(&p.seller_a.as_caller(), ihale.meta.id, bid(10, 20)).await.unwrap();
        services.ihaleler.submit_bid(&p.seller_b.as_caller(), ihale.meta.id, bid(12, 18)).await.unwrap();
        let winner = a.bids[0].id;

        let request = AcceptBidRequest { create_order: true, delivery_address: Some("Depo 3".into()), requested_delivery_date: None };
        let result = services.ihaleler.accept_bid(&buyer, ihale.meta.id, winner, request).await.unwrap();

        assert_eq!(result.ihale.status, IhaleStatus::Awarded);
        let statuses: Vec<TeklifStatus> = result.ihale.bids.iter().map(|b| b.status).collect();
        assert_eq!(statuses, vec![TeklifStatus::Accepted, TeklifStatus::Rejected]);

        let siparis = result.siparis.unwrap();
        assert_eq!(siparis.status, SiparisStatus::Created);
        assert_eq!(siparis.supplier_firma_id, p.seller_a.firma_id.unwrap());
        assert_eq!(siparis.total(), Some(Decimal::new(2000, 0)));
        assert_eq!(siparis.source.unwrap().teklif_id, winner);
    }

    #[tokio::test]
    async fn test_award_with_order_checks_supplier_before_awarding() {
        let services = services();
        let p = parties(&services).await;
        let buyer = p.buyer.as_caller();
        let ihale = published(&services, &buyer).await;
        let view = services.ihaleler.submit_bid(&p.seller_a.as_caller(), ihale.meta.id, bid(10, 20)).await.unwrap();
        let winner = view.bids[0].id;
        let supplier_id = p.seller_a.firma_id.unwrap();

        services.firmalar.deactivate(&admin(), supplier_id, "Audit".into()).await.unwrap();
        let request = AcceptBidRequest { create_order: true, ..Default::default() };
        let refused = services.ihaleler.accept_bid(&buyer, ihale.meta.id, winner, request.clone()).await;
        assert!(matches!(refused, Err(ServiceError::BusinessRule(_))));
        let untouched = services.ihaleler.get(&buyer, ihale.meta.id).await.unwrap();
        assert_eq!(untouched.status, IhaleStatus::Published);
        assert_eq!(untouched.bids[0].status, TeklifStatus::Submitted);

        services.firmalar.activate(&admin(), supplier_id).await.unwrap();
        let result = services.ihaleler.accept_bid(&buyer, ihale.meta.id, winner, request).await.unwrap();
        assert_eq!(result.ihale.status, IhaleStatus::Awarded);
        assert!(result.siparis.is_some());
        assert!(result.order_error.is_none());
    }

    #[tokio::test]
    async fn test_awarded_bid_can_be_ordered_later_once() {
        let services = services();
        let p = parties(&services).await;
        let buyer = p.buyer.as_caller();
        let ihale = published(&services, &buyer).await;
        let view = services.ihaleler.submit_bid(&p.seller_a.as_caller(), ihale.meta.id, bid(10, 20)).await.unwrap();
        let winner = view.bids[0].id;

        let not_yet = services.ihaleler.order_award(&buyer, ihale.meta.id, OrderAwardRequest::default()).await;
        assert!(matches!(not_yet, Err(ServiceError::BusinessRule(_))));

        let result =
            services.ihaleler.accept_bid(&buyer, ihale.meta.id, winner, AcceptBidRequest::default()).await.unwrap();
        assert!(result.siparis.is_none());

        let foreign = services
            .ihaleler
            .order_award(&p.seller_a.as_caller(), ihale.meta.id, OrderAwardRequest::default())
            .await;
        assert!(matches!(foreign, Err(ServiceError::Forbidden(_))));

        let request = OrderAwardRequest { delivery_address: Some("Depo 1".into()), requested_delivery_date: None };
        let siparis = services.ihaleler.order_award(&buyer, ihale.meta.id, request.clone()).await.unwrap();
        assert_eq!(siparis.source.unwrap().teklif_id, winner);
        assert_eq!(siparis.total(), Some(Decimal::new(2000, 0)));

        let twice = services.ihaleler.order_award(&buyer, ihale.meta.id, request).await;
        assert!(matches!(twice, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_suppliers_only_see_their_own_bids() {
        let services = services();
        let p = parties(&services).await;
        let buyer = p.buyer.as_caller();
        let ihale = published(&services, &buyer).await;
        services.ihaleler.submit_bid(&p.seller_a.as_caller(), ihale.meta.id, bid(10, 20)).await.unwrap();
        services.ihaleler.submit_bid(&p.seller_b.as_caller(), ihale.meta.id, bid(12, 18)).await.unwrap();

        let as_owner = services.ihaleler.get(&buyer, ihale.meta.id).await.unwrap();
        assert_eq!(as_owner.bids.len(), 2);

        let as_supplier = services.ihaleler.get(&p.seller_a.as_caller(), ihale.meta.id).await.unwrap();
        assert_eq!(as_supplier.bids.len(), 1);
        assert_eq!(as_supplier.bids[0].supplier_firma_id, p.seller_a.firma_id.unwrap());

        let participating = services
            .ihaleler
            .list(&p.seller_b.as_caller(), IhaleScope::Participating, None, None, None)
            .await
            .unwrap();
        assert_eq!(participating.len(), 1);
        assert_eq!(participating[0].bids.len(), 1);
    }

    #[tokio::test]
    async fn test_drafts_are_private() {
        let services = services();
        let p = parties(&services).await;
        let buyer = p.buyer.as_caller();
        let draft = services.ihaleler.create(&buyer, tender()).await.unwrap();

        let hidden = services.ihaleler.get(&p.seller_a.as_caller(), draft.meta.id).await;
        assert!(matches!(hidden, Err(ServiceError::NotFound(_))));

        let bid_on_draft = services.ihaleler.submit_bid(&p.seller_a.as_caller(), draft.meta.id, bid(1, 1)).await;
        assert!(matches!(bid_on_draft, Err(ServiceError::NotFound(_))));

        let withdraw_on_draft =
            services.ihaleler.withdraw_bid(&p.seller_a.as_caller(), draft.meta.id, Uuid::new_v4()).await;
        assert!(matches!(withdraw_on_draft, Err(ServiceError::NotFound(_))));

        let publish_foreign = services.ihaleler.publish(&p.seller_a.as_caller(), draft.meta.id).await;
        assert!(matches!(publish_foreign, Err(ServiceError::NotFound(_))));

        let open = services.ihaleler.list(&p.seller_a.as_caller(), IhaleScope::Open, None, None, None).await.unwrap();
        assert!(open.is_empty());
        assert_eq!(services.ihaleler.list(&buyer, IhaleScope::Own, None, None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bid_rules() {
        let services = services();
        let p = parties(&services).await;
        let buyer = p.buyer.as_caller();
        let ihale = published(&services, &buyer).await;
        let seller = p.seller_a.as_caller();

        let customer_bid = services.ihaleler.submit_bid(&buyer, ihale.meta.id, bid(1, 1)).await;
        assert!(matches!(customer_bid, Err(ServiceError::BusinessRule(_))));

        let view = services.ihaleler.submit_bid(&seller, ihale.meta.id, bid(10, 20)).await.unwrap();
        let again = services.ihaleler.submit_bid(&seller, ihale.meta.id, bid(9, 19)).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));

        let foreign_withdraw = services
            .ihaleler
            .withdraw_bid(&p.seller_b.as_caller(), ihale.meta.id, view.bids[0].id)
            .await;
        assert!(matches!(foreign_withdraw, Err(ServiceError::Forbidden(_))));

        let withdrawn = services.ihaleler.withdraw_bid(&seller, ihale.meta.id, view.bids[0].id).await.unwrap();
        assert_eq!(withdrawn.bids[0].status, TeklifStatus::Withdrawn);
        services.ihaleler.submit_bid(&seller, ihale.meta.id, bid(9, 19)).await.unwrap();
    }

    #[tokio::test]
    async fn test_owner_only_lifecycle_and_cancel() {
        let services = services();
        let p = parties(&services).await;
        let buyer = p.buyer.as_caller();
        let ihale = published(&services, &buyer).await;
        services.ihaleler.submit_bid(&p.seller_a.as_caller(), ihale.meta.id, bid(10, 20)).await.unwrap();

        let foreign_close = services.ihaleler.close(&p.seller_a.as_caller(), ihale.meta.id).await;
        assert!(matches!(foreign_close, Err(ServiceError::Forbidden(_))));

        let closed = services.ihaleler.close(&buyer, ihale.meta.id).await.unwrap();
        assert_eq!(closed.status, IhaleStatus::Closed);

        let cancelled = services.ihaleler.cancel(&admin(), ihale.meta.id, "Budget cut".into()).await.unwrap();
        assert_eq!(cancelled.status, IhaleStatus::Cancelled);
        assert_eq!(cancelled.bids[0].status, TeklifStatus::Rejected);

        services.ihaleler.delete(&buyer, ihale.meta.id).await.unwrap();
        assert!(matches!(services.ihaleler.get(&buyer, ihale.meta.id).await, Err(ServiceError::NotFound(_))));
    }
}
