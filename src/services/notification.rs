use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::core::deserialize_event;
use crate::domain::firma::FirmaEvent;
use crate::domain::ihale::IhaleEvent;
use crate::domain::notification::Notification;
use crate::domain::siparis::SiparisEvent;
use crate::domain::user::Caller;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{ListQuery, NotificationStore, OutboxMessage};

// ============================================================================
// Notification Service
// ============================================================================
//
// Notifications are addressed to firms and derived from outbox messages:
//
//   Firma approved / deactivated / activated      -> the firm itself
//   Teklif submitted / withdrawn                  -> tender owner
//   Teklif accepted / rejected                    -> the bidder
//   Ihale cancelled                               -> every bidder
//   Siparis created / items updated / cancelled /
//           delivered                             -> supplier
//   Siparis confirmed / rejected / shipped        -> customer
//
// ============================================================================

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        caller: &Caller,
        unread_only: bool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Vec<Notification>> {
        let firma_id = Self::firma_of(caller)?;
        let page = ListQuery::default().page(limit, offset);
        Ok(self.store.list(firma_id, unread_only, page.limit, page.offset).await?)
    }

    pub async fn unread_count(&self, caller: &Caller) -> ServiceResult<i64> {
        let firma_id = Self::firma_of(caller)?;
        Ok(self.store.unread_count(firma_id).await?)
    }

    pub async fn mark_read(&self, caller: &Caller, id: Uuid) -> ServiceResult<()> {
        let firma_id = Self::firma_of(caller)?;
        if !self.store.mark_read(firma_id, id, Utc::now()).await? {
            return Err(ServiceError::not_found("Notification", id));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, caller: &Caller) -> ServiceResult<u64> {
        let firma_id = Self::firma_of(caller)?;
        Ok(self.store.mark_all_read(firma_id, Utc::now()).await?)
    }

    /// Store the notifications for one outbox message; returns how many were new.
    pub async fn deliver(&self, notifications: &[Notification]) -> Result<u64, crate::store::StoreError> {
        if notifications.is_empty() {
            return Ok(0);
        }
        self.store.insert(notifications).await
    }

    fn firma_of(caller: &Caller) -> ServiceResult<Uuid> {
        caller
            .firma_id
            .ok_or_else(|| ServiceError::forbidden("Notifications are addressed to firms"))
    }
}

/// Notifications one outbox message produces. A payload that does not decode
/// as the event type of its aggregate is an error.
pub fn notifications_for(message: &OutboxMessage) -> Result<Vec<Notification>, serde_json::Error> {
    let recipients: Vec<(Uuid, String, String)> = match message.aggregate_type.as_str() {
        "Firma" => firma_notifications(message, deserialize_event(&message.payload)?),
        "Ihale" => ihale_notifications(message, deserialize_event(&message.payload)?),
        "Siparis" => siparis_notifications(message, deserialize_event(&message.payload)?),
        _ => Vec::new(),
    };

    Ok(recipients
        .into_iter()
        .map(|(firma_id, title, body)| {
            Notification::new(
                message.id,
                firma_id,
                title,
                body,
                &message.event_type,
                &message.aggregate_type,
                message.aggregate_id,
                message.created_at,
            )
        })
        .collect())
}

fn firma_notifications(message: &OutboxMessage, event: FirmaEvent) -> Vec<(Uuid, String, String)> {
    let firma_id = message.aggregate_id;
    match event {
        FirmaEvent::Approved => vec![(
            firma_id,
            "Firma approved".into(),
            "Your firm has been approved and can now trade on the portal.".into(),
        )],
        FirmaEvent::Deactivated { reason } => vec![(
            firma_id,
            "Firma deactivated".into(),
            format!("Your firm has been deactivated: {}", reason),
        )],
        FirmaEvent::Activated => vec![(
            firma_id,
            "Firma reactivated".into(),
            "Your firm is active again.".into(),
        )],
        _ => Vec::new(),
    }
}

fn ihale_notifications(message: &OutboxMessage, event: IhaleEvent) -> Vec<(Uuid, String, String)> {
    let ihale_id = message.aggregate_id;
    match event {
        IhaleEvent::BidSubmitted(teklif) => owner(message)
            .map(|owner| {
                vec![(
                    owner,
                    "New bid received".into(),
                    format!("A bid of {} was submitted on tender {}", teklif.total, ihale_id),
                )]
            })
            .unwrap_or_default(),
        IhaleEvent::BidWithdrawn { teklif_id, .. } => owner(message)
            .map(|owner| {
                vec![(owner, "Bid withdrawn".into(), format!("Bid {} on tender {} was withdrawn", teklif_id, ihale_id))]
            })
            .unwrap_or_default(),
        IhaleEvent::BidAccepted { supplier_firma_id, .. } => vec![(
            supplier_firma_id,
            "Bid accepted".into(),
            format!("Your bid on tender {} was accepted", ihale_id),
        )],
        IhaleEvent::BidRejected { supplier_firma_id, reason, .. } => vec![(
            supplier_firma_id,
            "Bid rejected".into(),
            format!("Your bid on tender {} was rejected: {}", ihale_id, reason),
        )],
        IhaleEvent::Cancelled { reason, .. } => counterparties(message)
            .map(|bidder| {
                (bidder, "Tender cancelled".to_string(), format!("Tender {} was cancelled: {}", ihale_id, reason))
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn siparis_notifications(message: &OutboxMessage, event: SiparisEvent) -> Vec<(Uuid, String, String)> {
    let siparis_id = message.aggregate_id;
    let to_supplier = |title: &str, body: String| -> Vec<(Uuid, String, String)> {
        counterparties(message).map(|supplier| (supplier, title.to_string(), body.clone())).collect()
    };
    let to_customer = |title: &str, body: String| -> Vec<(Uuid, String, String)> {
        owner(message).map(|customer| vec![(customer, title.to_string(), body)]).unwrap_or_default()
    };

    match event {
        SiparisEvent::Created(created) => {
            to_supplier("New order", format!("Order {} was placed with your firm", created.order_no))
        }
        SiparisEvent::ItemsUpdated { .. } => {
            to_supplier("Order updated", format!("The items of order {} were changed", siparis_id))
        }
        SiparisEvent::Cancelled { reason } => {
            to_supplier("Order cancelled", format!("Order {} was cancelled: {}", siparis_id, reason))
        }
        SiparisEvent::Delivered { .. } => {
            to_supplier("Order delivered", format!("Order {} was marked as delivered", siparis_id))
        }
        SiparisEvent::Confirmed { .. } => {
            to_customer("Order confirmed", format!("Order {} was confirmed by the supplier", siparis_id))
        }
        SiparisEvent::Rejected { reason } => {
            to_customer("Order rejected", format!("Order {} was rejected: {}", siparis_id, reason))
        }
        SiparisEvent::Shipped(shipment) => to_customer(
            "Order shipped",
            format!("Order {} was shipped with waybill {}", siparis_id, shipment.waybill_no),
        ),
        SiparisEvent::Deleted => Vec::new(),
    }
}

fn owner(message: &OutboxMessage) -> Option<Uuid> {
    message.owner_firma_id
}

/// Parties other than the owning firm.
fn counterparties(message: &OutboxMessage) -> impl Iterator<Item = Uuid> + '_ {
    message.parties.iter().copied().filter(move |party| Some(*party) != message.owner_firma_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::core::serialize_event;
    use crate::domain::siparis::Shipment;
    use crate::services::tests::{approved_firma, services};

    fn message(aggregate_type: &str, owner: Uuid, parties: Vec<Uuid>, payload: serde_json::Value, event_type: &str) -> OutboxMessage {
        OutboxMessage {
            id: Uuid::now_v7(),
            aggregate_type: aggregate_type.into(),
            aggregate_id: Uuid::new_v4(),
            owner_firma_id: Some(owner),
            parties,
            event_type: event_type.into(),
            payload,
            actor_user_id: None,
            actor_firma_id: None,
            created_at: Utc::now(),
            attempts: 0,
            last_error: None,
        }
    }

    #[test]
    fn test_order_events_route_to_counterparty() {
        let customer = Uuid::new_v4();
        let supplier = Uuid::new_v4();

        let cancelled = serialize_event(&SiparisEvent::Cancelled { reason: "Stok yok".into() }).unwrap();
        let out = notifications_for(&message("Siparis", customer, vec![customer, supplier], cancelled, "SiparisCancelled")).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].firma_id, supplier);
        assert!(out[0].message.contains("Stok yok"));

        let shipped = serialize_event(&SiparisEvent::Shipped(Shipment {
            waybill_no: "IRS-1".into(),
            carrier: None,
            shipped_at: Utc::now(),
        }))
        .unwrap();
        let out = notifications_for(&message("Siparis", customer, vec![customer, supplier], shipped, "SiparisShipped")).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].firma_id, customer);
    }

    #[test]
    fn test_tender_cancel_reaches_every_bidder() {
        let owner = Uuid::new_v4();
        let bidders = [Uuid::new_v4(), Uuid::new_v4()];
        let payload = serialize_event(&IhaleEvent::Cancelled { reason: "Budget".into(), at: Utc::now() }).unwrap();

        let out = notifications_for(&message("Ihale", owner, vec![owner, bidders[0], bidders[1]], payload, "IhaleCancelled")).unwrap();
        let recipients: Vec<Uuid> = out.iter().map(|n| n.firma_id).collect();
        assert_eq!(recipients, bidders.to_vec());
    }

    #[test]
    fn test_ids_are_stable_and_other_aggregates_are_silent() {
        let firma = Uuid::new_v4();
        let payload = serialize_event(&FirmaEvent::Approved).unwrap();
        let msg = message("Firma", firma, vec![firma], payload, "FirmaApproved");
        let first = notifications_for(&msg).unwrap();
        let second = notifications_for(&msg).unwrap();
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].firma_id, msg.aggregate_id);

        let user = message("User", firma, vec![firma], serde_json::json!({"type": "UserDisabled"}), "UserDisabled");
        assert!(notifications_for(&user).unwrap().is_empty());
    }

    #[test]
    fn test_undecodable_payload_is_an_error() {
        let firma = Uuid::new_v4();
        let msg = message("Siparis", firma, vec![firma], serde_json::json!({"type": "Exploded"}), "SiparisExploded");
        assert!(notifications_for(&msg).is_err());
    }

    #[tokio::test]
    async fn test_mark_read_is_scoped_to_firm() {
        let services = services();
        let (_, one) = approved_firma(&services, "1111111111", "a@one.com").await;
        let (_, two) = approved_firma(&services, "2222222222", "a@two.com").await;
        let (one, two) = (one.as_caller(), two.as_caller());

        let firma_id = one.firma_id.unwrap();
        let payload = serialize_event(&FirmaEvent::Approved).unwrap();
        let mut msg = message("Firma", firma_id, vec![firma_id], payload, "FirmaApproved");
        msg.aggregate_id = firma_id;
        let notifications = notifications_for(&msg).unwrap();

        assert_eq!(services.notifications.deliver(&notifications).await.unwrap(), 1);
        assert_eq!(services.notifications.deliver(&notifications).await.unwrap(), 0);
        assert_eq!(services.notifications.unread_count(&one).await.unwrap(), 1);

        let id = notifications[0].id;
        let foreign = services.notifications.mark_read(&two, id).await;
        assert!(matches!(foreign, Err(ServiceError::NotFound(_))));

        services.notifications.mark_read(&one, id).await.unwrap();
        assert_eq!(services.notifications.unread_count(&one).await.unwrap(), 0);
        assert_eq!(services.notifications.list(&one, false, None, None).await.unwrap().len(), 1);
        assert!(services.notifications.list(&one, true, None, None).await.unwrap().is_empty());
    }
}
