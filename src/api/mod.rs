// ============================================================================
// HTTP API
// ============================================================================
//
// Thin actix-web layer over the services. Every handler:
// - resolves the caller through the `Authenticated` extractor
// - calls exactly one service operation
// - wraps the result in `ApiResponse`
//
// Authorization lives in the services, not here.
//
// ============================================================================

mod auth;
mod firma;
mod ihale;
mod malzeme;
mod notification;
mod siparis;
mod system;
mod user;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::actors::SystemHandles;
use crate::error::ApiResponse;
use crate::metrics::metrics_handler;
use crate::services::Services;

pub use auth::{Authenticated, USER_ID_HEADER};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub handles: SystemHandles,
}

/// `?limit=&offset=` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct Page {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body of every "reason required" transition (deactivate, reject, cancel).
#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(data))
}

fn created<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Created().json(ApiResponse::ok(data))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(system::health))
        .route("/metrics", web::get().to(metrics_handler))
        .service(
            web::scope("/api")
                .configure(firma::configure)
                .configure(malzeme::configure)
                .configure(ihale::configure)
                .configure(siparis::configure)
                .configure(user::configure)
                .configure(notification::configure)
                .configure(system::configure),
        );
}
