use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::ihale::Ihale;
use crate::domain::siparis::{
    OrderNumber, Siparis, SiparisCommand, SiparisKalemi, SiparisSource, SiparisStatus,
};
use crate::domain::user::Caller;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::Metrics;
use crate::models::Currency;
use crate::store::{AggregateStore, ListQuery};
use super::command_handler::CommandHandler;
use super::firma::FirmaService;

// ============================================================================
// Siparis Service
// ============================================================================
//
// Customer side: create, update_items, deliver, cancel
// Supplier side: confirm, reject, ship
// Admins may act on either side.
//
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSiparisRequest {
    pub supplier_firma_id: Uuid,
    pub items: Vec<SiparisKalemi>,
    #[serde(default)]
    pub currency: Currency,
    pub delivery_address: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
    pub note: Option<String>,
}

/// One row of a bulk import; the supplier is referenced by id or tax number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRow {
    pub supplier_firma_id: Option<Uuid>,
    pub supplier_tax_number: Option<String>,
    pub items: Vec<SiparisKalemi>,
    #[serde(default)]
    pub currency: Currency,
    pub delivery_address: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipRequest {
    pub waybill_no: String,
    pub carrier: Option<String>,
}

/// Which side of the order the listing firm is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    #[default]
    Any,
    Customer,
    Supplier,
}

const ORDER_NO_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct SiparisService {
    handler: CommandHandler<Siparis>,
    firmalar: FirmaService,
}

impl SiparisService {
    pub fn new(store: Arc<dyn AggregateStore<Siparis>>, firmalar: FirmaService, metrics: Arc<Metrics>) -> Self {
        Self { handler: CommandHandler::new(store, metrics), firmalar }
    }

    pub async fn create(&self, caller: &Caller, request: CreateSiparisRequest) -> ServiceResult<Siparis> {
        let customer = self.firmalar.active_firma_of(caller).await?;
        if !customer.firma_type.is_customer() {
            return Err(ServiceError::BusinessRule("Only customer firms can place orders".into()));
        }
        self.require_supplier(request.supplier_firma_id).await?;

        self.create_order(
            caller,
            customer.meta.id,
            request.supplier_firma_id,
            None,
            request.items,
            request.currency,
            request.delivery_address,
            request.requested_delivery_date,
            request.note,
        )
        .await
    }

    /// Order the winning bid of an awarded tender, one line per tender item.
    pub async fn create_from_bid(
        &self,
        caller: &Caller,
        ihale: &Ihale,
        teklif_id: Uuid,
        delivery_address: Option<String>,
        requested_delivery_date: Option<NaiveDate>,
    ) -> ServiceResult<Siparis> {
        let bid = ihale
            .awarded_bid()
            .filter(|bid| bid.id == teklif_id)
            .ok_or_else(|| ServiceError::BusinessRule(format!("Bid {} is not the awarded bid", teklif_id)))?;
        self.require_supplier(bid.supplier_firma_id).await?;

        let items = ihale
            .items
            .iter()
            .map(|item| {
                let priced = bid
                    .items
                    .iter()
                    .find(|priced| priced.item_no == item.item_no)
                    .ok_or_else(|| ServiceError::Internal(format!("Bid {} misses item {}", bid.id, item.item_no)))?;
                Ok(SiparisKalemi {
                    malzeme_id: item.malzeme_id,
                    description: item.description.clone(),
                    quantity: item.quantity,
                    unit: item.unit,
                    unit_price: priced.unit_price,
                })
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        self.create_order(
            caller,
            ihale.customer_firma_id,
            bid.supplier_firma_id,
            Some(SiparisSource { ihale_id: ihale.meta.id, teklif_id }),
            items,
            ihale.currency,
            delivery_address,
            requested_delivery_date,
            Some(format!("Ihale: {}", ihale.title)),
        )
        .await
    }

    /// Create one imported order as the submitting caller.
    pub async fn import_row(&self, caller: &Caller, row: ImportRow) -> ServiceResult<Siparis> {
        let supplier_firma_id = match (row.supplier_firma_id, row.supplier_tax_number.as_deref()) {
            (Some(id), _) => id,
            (None, Some(tax_number)) => self
                .firmalar
                .find_by_tax_number(tax_number)
                .await?
                .map(|firma| firma.meta.id)
                .ok_or_else(|| ServiceError::Validation(format!("No firm with tax number {}", tax_number)))?,
            (None, None) => {
                return Err(ServiceError::Validation("Row names no supplier".into()));
            }
        };

        let request = CreateSiparisRequest {
            supplier_firma_id,
            items: row.items,
            currency: row.currency,
            delivery_address: row.delivery_address,
            requested_delivery_date: row.requested_delivery_date,
            note: row.note,
        };
        self.create(caller, request).await
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> ServiceResult<Siparis> {
        let siparis = self.handler.load(id).await?;
        if caller.can_access_firma(siparis.customer_firma_id) || caller.can_access_firma(siparis.supplier_firma_id) {
            Ok(siparis)
        } else {
            Err(ServiceError::not_found("Siparis", id))
        }
    }

    pub async fn list(
        &self,
        caller: &Caller,
        side: OrderSide,
        status: Option<SiparisStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Vec<Siparis>> {
        let mut query = match caller.firma_id {
            None if caller.is_admin() => ListQuery::default(),
            None => return Err(ServiceError::forbidden("This action requires a firm account")),
            Some(firma_id) => match side {
                OrderSide::Customer => ListQuery::owned_by(firma_id),
                OrderSide::Supplier | OrderSide::Any => ListQuery::involving(firma_id),
            },
        };
        if let Some(status) = status {
            query = query.with_status(status.as_str());
        }

        let mut orders = self.handler.list(&query.page(limit, offset)).await?;
        if let (OrderSide::Supplier, Some(firma_id)) = (side, caller.firma_id) {
            orders.retain(|order| order.is_supplier(firma_id));
        }
        Ok(orders)
    }

    pub async fn update_items(&self, caller: &Caller, id: Uuid, items: Vec<SiparisKalemi>) -> ServiceResult<Siparis> {
        let siparis = self.customer_side(caller, id).await?;
        self.handler.execute(Some(caller), siparis, SiparisCommand::UpdateItems { items }).await
    }

    pub async fn confirm(&self, caller: &Caller, id: Uuid) -> ServiceResult<Siparis> {
        let siparis = self.supplier_side(caller, id).await?;
        self.handler.execute(Some(caller), siparis, SiparisCommand::Confirm { at: Utc::now() }).await
    }

    pub async fn reject(&self, caller: &Caller, id: Uuid, reason: String) -> ServiceResult<Siparis> {
        let siparis = self.supplier_side(caller, id).await?;
        self.handler.execute(Some(caller), siparis, SiparisCommand::Reject { reason }).await
    }

    pub async fn ship(&self, caller: &Caller, id: Uuid, request: ShipRequest) -> ServiceResult<Siparis> {
        let siparis = self.supplier_side(caller, id).await?;
        let command = SiparisCommand::Ship { waybill_no: request.waybill_no, carrier: request.carrier, at: Utc::now() };
        self.handler.execute(Some(caller), siparis, command).await
    }

    pub async fn deliver(&self, caller: &Caller, id: Uuid) -> ServiceResult<Siparis> {
        let siparis = self.customer_side(caller, id).await?;
        self.handler.execute(Some(caller), siparis, SiparisCommand::Deliver { at: Utc::now() }).await
    }

    pub async fn cancel(&self, caller: &Caller, id: Uuid, reason: String) -> ServiceResult<Siparis> {
        let siparis = self.customer_side(caller, id).await?;
        self.handler.execute(Some(caller), siparis, SiparisCommand::Cancel { reason }).await
    }

    pub async fn delete(&self, caller: &Caller, id: Uuid) -> ServiceResult<Siparis> {
        let siparis = self.customer_side(caller, id).await?;
        self.handler.execute(Some(caller), siparis, SiparisCommand::Delete).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_order(
        &self,
        caller: &Caller,
        customer_firma_id: Uuid,
        supplier_firma_id: Uuid,
        source: Option<SiparisSource>,
        items: Vec<SiparisKalemi>,
        currency: Currency,
        delivery_address: Option<String>,
        requested_delivery_date: Option<NaiveDate>,
        note: Option<String>,
    ) -> ServiceResult<Siparis> {
        let (id, order_no) = self.fresh_order_number().await?;
        let command = SiparisCommand::Create {
            order_no,
            customer_firma_id,
            supplier_firma_id,
            source,
            items,
            currency,
            delivery_address,
            requested_delivery_date,
            note,
        };
        self.handler.create(Some(caller), id, command).await
    }

    /// Pick an id whose order number is not taken yet.
    async fn fresh_order_number(&self) -> ServiceResult<(Uuid, OrderNumber)> {
        for _ in 0..ORDER_NO_ATTEMPTS {
            let id = Uuid::now_v7();
            let order_no = OrderNumber::generate(id, Utc::now().date_naive());
            if self.handler.find_by_unique_key(&order_no.unique_key()).await?.is_none() {
                return Ok((id, order_no));
            }
            tracing::warn!(order_no = %order_no, "Order number already taken, drawing another");
        }
        Err(ServiceError::Conflict("Could not allocate a free order number".into()))
    }

    pub async fn require_supplier(&self, supplier_firma_id: Uuid) -> ServiceResult<()> {
        let supplier = self.firmalar.require_active(supplier_firma_id).await?;
        if !supplier.firma_type.is_supplier() {
            return Err(ServiceError::BusinessRule(format!("Firma {} is not a supplier", supplier_firma_id)));
        }
        Ok(())
    }

    async fn customer_side(&self, caller: &Caller, id: Uuid) -> ServiceResult<Siparis> {
        let siparis = self.get(caller, id).await?;
        if !caller.can_access_firma(siparis.customer_firma_id) {
            return Err(ServiceError::forbidden("Only the customer can do this"));
        }
        Ok(siparis)
    }

    async fn supplier_side(&self, caller: &Caller, id: Uuid) -> ServiceResult<Siparis> {
        let siparis = self.get(caller, id).await?;
        if !caller.can_access_firma(siparis.supplier_firma_id) {
            return Err(ServiceError::forbidden("Only the supplier can do this"));
        }
        Ok(siparis)
    }
}
