use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::malzeme::{Malzeme, MalzemeCommand, MalzemeStatus, MaterialCode};
use crate::domain::user::Caller;
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::Metrics;
use crate::models::{Currency, Unit};
use crate::store::{AggregateStore, ListQuery};
use super::command_handler::CommandHandler;
use super::firma::FirmaService;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMalzemeRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub unit: Unit,
    pub unit_price: Decimal,
    #[serde(default)]
    pub currency: Currency,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMalzemeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub unit: Option<Unit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePriceRequest {
    pub unit_price: Decimal,
    #[serde(default)]
    pub currency: Currency,
}

#[derive(Clone)]
pub struct MalzemeService {
    handler: CommandHandler<Malzeme>,
    firmalar: FirmaService,
}

impl MalzemeService {
    pub fn new(store: Arc<dyn AggregateStore<Malzeme>>, firmalar: FirmaService, metrics: Arc<Metrics>) -> Self {
        Self { handler: CommandHandler::new(store, metrics), firmalar }
    }

    pub async fn create(&self, caller: &Caller, request: CreateMalzemeRequest) -> ServiceResult<Malzeme> {
        let firma = self.firmalar.active_firma_of(caller).await?;
        if !firma.firma_type.is_supplier() {
            return Err(ServiceError::BusinessRule("Only supplier firms keep a material catalog".into()));
        }

        let command = MalzemeCommand::Create {
            firma_id: firma.meta.id,
            code: MaterialCode::new(request.code),
            name: request.name,
            description: request.description,
            category: request.category,
            unit: request.unit,
            unit_price: request.unit_price,
            currency: request.currency,
        };
        self.handler.create(Some(caller), Uuid::now_v7(), command).await
    }

    /// Owners see their own materials in any state; everyone else only
    /// active materials of active firms.
    pub async fn get(&self, caller: &Caller, id: Uuid) -> ServiceResult<Malzeme> {
        let malzeme = self.handler.load(id).await?;
        if caller.can_access_firma(malzeme.firma_id) {
            return Ok(malzeme);
        }
        if malzeme.is_active() && self.firmalar.require_active(malzeme.firma_id).await.is_ok() {
            return Ok(malzeme);
        }
        Err(ServiceError::not_found("Malzeme", id))
    }

    pub async fn list_own(
        &self,
        caller: &Caller,
        status: Option<MalzemeStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Vec<Malzeme>> {
        let firma_id = caller
            .firma_id
            .ok_or_else(|| ServiceError::forbidden("This action requires a firm account"))?;
        let mut query = ListQuery::owned_by(firma_id);
        if let Some(status) = status {
            query = query.with_status(status.as_str());
        }
        self.handler.list(&query.page(limit, offset)).await
    }

    /// Catalog exchange: the active materials of an active supplier.
    pub async fn catalog(
        &self,
        caller: &Caller,
        supplier_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Vec<Malzeme>> {
        if !caller.is_admin() {
            self.firmalar.active_firma_of(caller).await?;
        }
        let supplier = self.firmalar.require_active(supplier_id).await?;
        if !supplier.firma_type.is_supplier() {
            return Err(ServiceError::BusinessRule(format!("Firma {} is not a supplier", supplier_id)));
        }

        let query = ListQuery::owned_by(supplier_id)
            .with_status(MalzemeStatus::Active.as_str())
            .page(limit, offset);
        self.handler.list(&query).await
    }

    pub async fn update(&self, caller: &Caller, id: Uuid, request: UpdateMalzemeRequest) -> ServiceResult<Malzeme> {
        let command = MalzemeCommand::Update {
            name: request.name,
            description: request.description,
            category: request.category,
            unit: request.unit,
        };
        self.owner_command(caller, id, command).await
    }

    pub async fn change_price(&self, caller: &Caller, id: Uuid, request: ChangePriceRequest) -> ServiceResult<Malzeme> {
        let command = MalzemeCommand::ChangePrice { unit_price: request.unit_price, currency: request.currency };
        self.owner_command(caller, id, command).await
    }

    pub async fn deactivate(&self, caller: &Caller, id: Uuid) -> ServiceResult<Malzeme> {
        self.owner_command(caller, id, MalzemeCommand::Deactivate).await
    }

    pub async fn activate(&self, caller: &Caller, id: Uuid) -> ServiceResult<Malzeme> {
        self.owner_command(caller, id, MalzemeCommand::Activate).await
    }

    pub async fn delete(&self, caller: &Caller, id: Uuid) -> ServiceResult<Malzeme> {
        self.owner_command(caller, id, MalzemeCommand::Delete).await
    }

    async fn owner_command(&self, caller: &Caller, id: Uuid, command: MalzemeCommand) -> ServiceResult<Malzeme> {
        let malzeme = self.handler.load(id).await?;
        if !caller.can_access_firma(malzeme.firma_id) {
            return Err(ServiceError::forbidden("Only the owning firm can change this material"));
        }
        self.handler.execute(Some(caller), malzeme, command).await
    }
}
