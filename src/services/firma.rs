use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::firma::{Firma, FirmaCommand, FirmaStatus, FirmaType, TaxNumber};
use crate::domain::user::{Caller, User};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::Metrics;
use crate::store::{AggregateStore, ListQuery};
use super::command_handler::CommandHandler;
use super::user::UserService;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterFirmaRequest {
    pub name: String,
    pub tax_number: String,
    pub tax_office: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: String,
    pub firma_type: FirmaType,
    pub admin_full_name: String,
    pub admin_email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFirmaRequest {
    pub name: Option<String>,
    pub tax_office: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub firma_type: Option<FirmaType>,
}

#[derive(Clone)]
pub struct FirmaService {
    handler: CommandHandler<Firma>,
    users: UserService,
}

impl FirmaService {
    pub fn new(store: Arc<dyn AggregateStore<Firma>>, users: UserService, metrics: Arc<Metrics>) -> Self {
        Self { handler: CommandHandler::new(store, metrics), users }
    }

    /// Public self-registration: the firm waits for approval, its first
    /// user becomes the firm admin.
    pub async fn register(&self, request: RegisterFirmaRequest) -> ServiceResult<(Firma, User)> {
        // The firm and its admin are two rows; refuse early when the second
        // insert is already known to fail.
        if self.users.email_taken(&request.admin_email).await? {
            return Err(ServiceError::Conflict(format!("Email already registered: {}", request.admin_email)));
        }

        let command = FirmaCommand::Register {
            name: request.name,
            tax_number: TaxNumber::new(request.tax_number),
            tax_office: request.tax_office,
            address: request.address,
            phone: request.phone,
            email: request.email,
            firma_type: request.firma_type,
        };
        let firma = self.handler.create(None, Uuid::now_v7(), command).await?;

        let admin = self
            .users
            .create_firma_admin(firma.meta.id, &request.admin_email, &request.admin_full_name)
            .await
            .inspect_err(|e| {
                tracing::error!(firma_id = %firma.meta.id, error = %e, "Firma registered without its admin user");
            })?;

        tracing::info!(
            firma_id = %firma.meta.id,
            tax_number = %firma.tax_number.as_str(),
            admin_user_id = %admin.meta.id,
            "Firma registered, awaiting approval"
        );
        Ok((firma, admin))
    }

    /// Members and admins see any state; other firms see only active ones.
    pub async fn get(&self, caller: &Caller, id: Uuid) -> ServiceResult<Firma> {
        let firma = self.handler.load(id).await?;
        if caller.can_access_firma(id) || firma.is_active() {
            Ok(firma)
        } else {
            Err(ServiceError::not_found("Firma", id))
        }
    }

    pub async fn list(
        &self,
        caller: &Caller,
        status: Option<FirmaStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Vec<Firma>> {
        let status = if caller.is_admin() { status } else { Some(FirmaStatus::Active) };
        let query = match status {
            Some(status) => ListQuery::default().with_status(status.as_str()),
            None => ListQuery::default(),
        };
        self.handler.list(&query.page(limit, offset)).await
    }

    pub async fn update_profile(&self, caller: &Caller, id: Uuid, request: UpdateFirmaRequest) -> ServiceResult<Firma> {
        if !caller.can_manage_firma(id) {
            return Err(ServiceError::forbidden("Only the firm admin can edit the firm profile"));
        }
        let firma = self.handler.load(id).await?;
        let command = FirmaCommand::UpdateProfile {
            name: request.name,
            tax_office: request.tax_office,
            address: request.address,
            phone: request.phone,
            email: request.email,
            firma_type: request.firma_type,
        };
        self.handler.execute(Some(caller), firma, command).await
    }

    pub async fn approve(&self, caller: &Caller, id: Uuid) -> ServiceResult<Firma> {
        self.admin_command(caller, id, FirmaCommand::Approve).await
    }

    pub async fn deactivate(&self, caller: &Caller, id: Uuid, reason: String) -> ServiceResult<Firma> {
        self.admin_command(caller, id, FirmaCommand::Deactivate { reason }).await
    }

    pub async fn activate(&self, caller: &Caller, id: Uuid) -> ServiceResult<Firma> {
        self.admin_command(caller, id, FirmaCommand::Activate).await
    }

    pub async fn delete(&self, caller: &Caller, id: Uuid) -> ServiceResult<Firma> {
        self.admin_command(caller, id, FirmaCommand::Delete).await
    }

    /// The caller's own firm, which must be active to trade.
    pub async fn active_firma_of(&self, caller: &Caller) -> ServiceResult<Firma> {
        let id = caller
            .firma_id
            .ok_or_else(|| ServiceError::forbidden("This action requires a firm account"))?;
        self.require_active(id).await
    }

    /// Any firm by id, required to be active.
    pub async fn require_active(&self, id: Uuid) -> ServiceResult<Firma> {
        let firma = self.handler.load(id).await?;
        if !firma.is_active() {
            return Err(ServiceError::BusinessRule(format!(
                "Firma {} is not active ({})",
                id,
                firma.status.as_str()
            )));
        }
        Ok(firma)
    }

    pub async fn find_by_tax_number(&self, tax_number: &str) -> ServiceResult<Option<Firma>> {
        let tax_number = TaxNumber::new(tax_number);
        self.handler
            .find_by_unique_key(&format!("tax_number:{}", tax_number.as_str()))
            .await
    }

    async fn admin_command(&self, caller: &Caller, id: Uuid, command: FirmaCommand) -> ServiceResult<Firma> {
        if !caller.is_admin() {
            return Err(ServiceError::forbidden("Only admins can change the firm status"));
        }
        let firma = self.handler.load(id).await?;
        self.handler.execute(Some(caller), firma, command).await
    }
}
