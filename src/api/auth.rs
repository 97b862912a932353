use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use std::ops::Deref;
use uuid::Uuid;

use crate::domain::user::Caller;
use crate::error::ServiceError;
use super::AppState;

/// Header set by the gateway after it has authenticated the user.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The caller behind a request, resolved from [`USER_ID_HEADER`].
///
/// Unknown, disabled or malformed ids are rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Caller);

impl Deref for Authenticated {
    type Target = Caller;

    fn deref(&self) -> &Caller {
        &self.0
    }
}

impl FromRequest for Authenticated {
    type Error = ServiceError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok());
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let user_id = user_id.ok_or(ServiceError::Unauthorized)?;
            let state = state.ok_or_else(|| ServiceError::Internal("application state not configured".into()))?;
            let caller = state.services.users.authenticate(user_id).await?;
            Ok(Authenticated(caller))
        })
    }
}
