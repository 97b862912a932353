use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::core::Aggregate;
use crate::domain::firma::Firma;
use crate::domain::user::{Caller, Role, User, UserCommand};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics::Metrics;
use crate::store::{AggregateStore, ListQuery};
use super::command_handler::CommandHandler;

// ============================================================================
// User Management
// ============================================================================
//
// Admin manages everyone. A FirmaAdmin manages the users of its own firm and
// cannot grant Admin. Plain users manage nobody, only their own profile.
//
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub full_name: String,
    pub firma_id: Option<Uuid>,
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    handler: CommandHandler<User>,
    firmalar: Arc<dyn AggregateStore<Firma>>,
}

fn email_key(email: &str) -> String {
    format!("email:{}", email.trim().to_lowercase())
}

impl UserService {
    pub fn new(
        users: Arc<dyn AggregateStore<User>>,
        firmalar: Arc<dyn AggregateStore<Firma>>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { handler: CommandHandler::new(users, metrics), firmalar }
    }

    /// Resolve the user forwarded by the gateway into a caller.
    pub async fn authenticate(&self, user_id: Uuid) -> ServiceResult<Caller> {
        match self.handler.load(user_id).await {
            Ok(user) if user.is_active() => Ok(user.as_caller()),
            Ok(_) => {
                tracing::warn!(user_id = %user_id, "Disabled user rejected");
                Err(ServiceError::Unauthorized)
            }
            Err(ServiceError::NotFound(_)) => Err(ServiceError::Unauthorized),
            Err(e) => Err(e),
        }
    }

    pub async fn email_taken(&self, email: &str) -> ServiceResult<bool> {
        Ok(self.handler.find_by_unique_key(&email_key(email)).await?.is_some())
    }

    pub async fn me(&self, caller: &Caller) -> ServiceResult<User> {
        self.handler.load(caller.user_id).await
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> ServiceResult<User> {
        let user = self.handler.load(id).await?;
        if !Self::can_view(caller, &user) {
            return Err(ServiceError::not_found("User", id));
        }
        Ok(user)
    }

    pub async fn list(
        &self,
        caller: &Caller,
        firma_id: Option<Uuid>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> ServiceResult<Vec<User>> {
        let query = if caller.is_admin() {
            ListQuery { owner_firma_id: firma_id, ..ListQuery::default() }
        } else {
            let own = caller.firma_id.ok_or_else(|| ServiceError::forbidden("Caller has no firm"))?;
            if firma_id.is_some_and(|requested| requested != own) {
                return Err(ServiceError::forbidden("Users of other firms are not visible"));
            }
            ListQuery::owned_by(own)
        };
        self.handler.list(&query.page(limit, offset)).await
    }

    pub async fn create(&self, caller: &Caller, request: CreateUserRequest) -> ServiceResult<User> {
        match caller.role {
            Role::Admin => {}
            Role::FirmaAdmin => {
                if request.role == Role::Admin {
                    return Err(ServiceError::forbidden("Only admins can create admins"));
                }
                if request.firma_id != caller.firma_id {
                    return Err(ServiceError::forbidden("Users can only be created for your own firm"));
                }
            }
            Role::User => return Err(ServiceError::forbidden("Not allowed to manage users")),
        }

        if let Some(firma_id) = request.firma_id {
            self.require_firma(firma_id).await?;
        }

        self.create_unchecked(Some(caller), request).await
    }

    /// First user of a newly registered firm.
    pub(crate) async fn create_firma_admin(&self, firma_id: Uuid, email: &str, full_name: &str) -> ServiceResult<User> {
        let request = CreateUserRequest {
            email: email.to_string(),
            full_name: full_name.to_string(),
            firma_id: Some(firma_id),
            role: Role::FirmaAdmin,
        };
        self.create_unchecked(None, request).await
    }

    /// Create the platform admin on an empty installation.
    pub async fn ensure_bootstrap_admin(&self, email: &str) -> ServiceResult<Option<User>> {
        if self.email_taken(email).await? {
            tracing::debug!(email = %email, "Bootstrap admin already exists");
            return Ok(None);
        }

        let request = CreateUserRequest {
            email: email.to_string(),
            full_name: "Administrator".to_string(),
            firma_id: None,
            role: Role::Admin,
        };
        let admin = self.create_unchecked(None, request).await?;
        tracing::info!(user_id = %admin.meta.id, email = %admin.email, "Bootstrap admin created");
        Ok(Some(admin))
    }

    pub async fn update_profile(&self, caller: &Caller, id: Uuid, request: UpdateUserRequest) -> ServiceResult<User> {
        let user = self.handler.load(id).await?;
        if caller.user_id != id && !Self::can_manage(caller, &user) {
            return Err(ServiceError::forbidden("Not allowed to edit this user"));
        }
        let command = UserCommand::UpdateProfile { email: request.email, full_name: request.full_name };
        self.handler.execute(Some(caller), user, command).await
    }

    pub async fn change_role(&self, caller: &Caller, id: Uuid, role: Role) -> ServiceResult<User> {
        let user = self.managed_user(caller, id).await?;
        if role == Role::Admin && !caller.is_admin() {
            return Err(ServiceError::forbidden("Only admins can grant the admin role"));
        }
        self.handler.execute(Some(caller), user, UserCommand::ChangeRole { role }).await
    }

    pub async fn disable(&self, caller: &Caller, id: Uuid) -> ServiceResult<User> {
        let user = self.managed_user(caller, id).await?;
        self.handler.execute(Some(caller), user, UserCommand::Disable).await
    }

    pub async fn enable(&self, caller: &Caller, id: Uuid) -> ServiceResult<User> {
        let user = self.managed_user(caller, id).await?;
        self.handler.execute(Some(caller), user, UserCommand::Enable).await
    }

    pub async fn delete(&self, caller: &Caller, id: Uuid) -> ServiceResult<User> {
        let user = self.managed_user(caller, id).await?;
        self.handler.execute(Some(caller), user, UserCommand::Delete).await
    }

    async fn create_unchecked(&self, caller: Option<&Caller>, request: CreateUserRequest) -> ServiceResult<User> {
        let command = UserCommand::Create {
            email: request.email,
            full_name: request.full_name,
            firma_id: request.firma_id,
            role: request.role,
        };
        self.handler.create(caller, Uuid::now_v7(), command).await
    }

    async fn require_firma(&self, firma_id: Uuid) -> ServiceResult<Firma> {
        match self.firmalar.load(firma_id).await? {
            Some(firma) if !firma.is_deleted() => Ok(firma),
            _ => Err(ServiceError::not_found("Firma", firma_id)),
        }
    }

    /// Load a user the caller may administer; nobody administers themselves.
    async fn managed_user(&self, caller: &Caller, id: Uuid) -> ServiceResult<User> {
        if caller.user_id == id {
            return Err(ServiceError::forbidden("You cannot change your own account status or role"));
        }
        let user = self.handler.load(id).await?;
        if !Self::can_manage(caller, &user) {
            return Err(ServiceError::forbidden("Not allowed to manage this user"));
        }
        Ok(user)
    }

    fn can_manage(caller: &Caller, user: &User) -> bool {
        match user.firma_id {
            _ if caller.is_admin() => true,
            Some(firma_id) => caller.can_manage_firma(firma_id) && user.role != Role::Admin,
            None => false,
        }
    }

    fn can_view(caller: &Caller, user: &User) -> bool {
        caller.user_id == user.meta.id
            || caller.is_admin()
            || user.firma_id.is_some_and(|firma_id| caller.can_access_firma(firma_id))
    }
}
