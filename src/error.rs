use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::domain::firma::FirmaError;
use crate::domain::ihale::IhaleError;
use crate::domain::malzeme::MalzemeError;
use crate::domain::siparis::SiparisError;
use crate::domain::user::UserError;
use crate::store::StoreError;

// ============================================================================
// Service Errors and the API envelope
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    BusinessRule(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", what, id))
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        ServiceError::Forbidden(reason.into())
    }
}

/// Uniform response body: `{ success, message, data }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, message: None, data: Some(data) }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: Some(message.into()), data: None }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::BusinessRule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ServiceError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed with internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ApiResponse::<()>::failure(message))
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => ServiceError::NotFound(e.to_string()),
            StoreError::Concurrency { .. } => {
                ServiceError::Conflict("The record was changed by someone else, reload and retry".into())
            }
            StoreError::UniqueViolation(key) => ServiceError::Conflict(format!("Already exists: {}", key)),
            StoreError::Serialization(_) | StoreError::Backend(_) => ServiceError::Internal(e.to_string()),
        }
    }
}

impl From<actix::MailboxError> for ServiceError {
    fn from(e: actix::MailboxError) -> Self {
        ServiceError::Internal(format!("background worker unavailable: {}", e))
    }
}

impl From<FirmaError> for ServiceError {
    fn from(e: FirmaError) -> Self {
        match e {
            FirmaError::EmptyName | FirmaError::InvalidTaxNumber(_) | FirmaError::InvalidEmail(_) => {
                ServiceError::Validation(e.to_string())
            }
            FirmaError::Deleted => ServiceError::NotFound(e.to_string()),
            FirmaError::NotInitialized => ServiceError::Internal(e.to_string()),
            _ => ServiceError::BusinessRule(e.to_string()),
        }
    }
}

impl From<MalzemeError> for ServiceError {
    fn from(e: MalzemeError) -> Self {
        match e {
            MalzemeError::EmptyCode | MalzemeError::EmptyName | MalzemeError::NegativePrice(_) => {
                ServiceError::Validation(e.to_string())
            }
            MalzemeError::Deleted => ServiceError::NotFound(e.to_string()),
            MalzemeError::NotInitialized => ServiceError::Internal(e.to_string()),
            _ => ServiceError::BusinessRule(e.to_string()),
        }
    }
}

impl From<IhaleError> for ServiceError {
    fn from(e: IhaleError) -> Self {
        match e {
            IhaleError::EmptyTitle
            | IhaleError::EmptyItems
            | IhaleError::InvalidQuantity(_)
            | IhaleError::DuplicateItemNo(_)
            | IhaleError::IncompleteBid
            | IhaleError::UnknownItem(_)
            | IhaleError::InvalidUnitPrice(_)
            | IhaleError::AmountOverflow(_) => ServiceError::Validation(e.to_string()),
            IhaleError::BidNotFound(_) | IhaleError::Deleted => ServiceError::NotFound(e.to_string()),
            IhaleError::NotBidOwner => ServiceError::Forbidden(e.to_string()),
            IhaleError::DuplicateBid => ServiceError::Conflict(e.to_string()),
            IhaleError::NotInitialized => ServiceError::Internal(e.to_string()),
            _ => ServiceError::BusinessRule(e.to_string()),
        }
    }
}

impl From<SiparisError> for ServiceError {
    fn from(e: SiparisError) -> Self {
        match e {
            SiparisError::EmptyItems
            | SiparisError::InvalidQuantity(_)
            | SiparisError::InvalidUnitPrice(..)
            | SiparisError::AmountOverflow(_)
            | SiparisError::SameParty
            | SiparisError::MissingWaybill
            | SiparisError::MissingReason => ServiceError::Validation(e.to_string()),
            SiparisError::Deleted => ServiceError::NotFound(e.to_string()),
            SiparisError::NotInitialized => ServiceError::Internal(e.to_string()),
            _ => ServiceError::BusinessRule(e.to_string()),
        }
    }
}

impl From<UserError> for ServiceError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::InvalidEmail(_)
            | UserError::EmptyName
            | UserError::FirmaRequired(_)
            | UserError::AdminWithFirma => ServiceError::Validation(e.to_string()),
            UserError::Deleted => ServiceError::NotFound(e.to_string()),
            UserError::NotInitialized => ServiceError::Internal(e.to_string()),
            _ => ServiceError::BusinessRule(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServiceError::forbidden("no").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ServiceError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ServiceError::BusinessRule("x".into()).status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_store_error_mapping() {
        let conflict: ServiceError = StoreError::UniqueViolation("tax_number:1234567890".into()).into();
        assert!(matches!(conflict, ServiceError::Conflict(ref m) if m.contains("tax_number")));

        let stale: ServiceError =
            StoreError::Concurrency { aggregate_type: "Siparis", id: Uuid::new_v4(), expected: 3 }.into();
        assert!(matches!(stale, ServiceError::Conflict(_)));

        let backend: ServiceError = StoreError::Backend("connection reset".into()).into();
        assert!(matches!(backend, ServiceError::Internal(_)));
    }

    #[test]
    fn test_domain_error_mapping() {
        assert!(matches!(ServiceError::from(SiparisError::EmptyItems), ServiceError::Validation(_)));
        assert!(matches!(ServiceError::from(IhaleError::NotBidOwner), ServiceError::Forbidden(_)));
        assert!(matches!(ServiceError::from(IhaleError::AmountOverflow(1)), ServiceError::Validation(_)));
        assert!(matches!(ServiceError::from(SiparisError::AmountOverflow(1)), ServiceError::Validation(_)));
        assert!(matches!(ServiceError::from(FirmaError::AlreadyApproved), ServiceError::BusinessRule(_)));
    }

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(ApiResponse::ok(5)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], 5);

        let body = serde_json::to_value(ApiResponse::<()>::failure("nope")).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "nope");
        assert!(body["data"].is_null());
    }
}
