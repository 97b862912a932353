use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::firma::{Firma, FirmaStatus};
use crate::domain::user::User;
use crate::error::ServiceResult;
use crate::services::firma::{RegisterFirmaRequest, UpdateFirmaRequest};
use super::{created, ok, AppState, Authenticated, Page, ReasonRequest};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/firmalar")
            .route("", web::post().to(register))
            .route("", web::get().to(list))
            .route("/{id}", web::get().to(get))
            .route("/{id}", web::put().to(update))
            .route("/{id}", web::delete().to(delete))
            .route("/{id}/approve", web::post().to(approve))
            .route("/{id}/deactivate", web::post().to(deactivate))
            .route("/{id}/activate", web::post().to(activate))
            .route("/{id}/katalog", web::get().to(catalog)),
    );
}

#[derive(Debug, Serialize)]
struct Registration {
    firma: Firma,
    admin: User,
}

#[derive(Debug, Deserialize)]
struct FirmaFilter {
    status: Option<FirmaStatus>,
    limit: Option<i64>,
    offset: Option<i64>,
}

/// Self-service registration; the firm waits for approval.
async fn register(state: web::Data<AppState>, body: web::Json<RegisterFirmaRequest>) -> ServiceResult<HttpResponse> {
    let (firma, admin) = state.services.firmalar.register(body.into_inner()).await?;
    Ok(created(Registration { firma, admin }))
}

async fn list(
    state: web::Data<AppState>,
    caller: Authenticated,
    filter: web::Query<FirmaFilter>,
) -> ServiceResult<HttpResponse> {
    let filter = filter.into_inner();
    let firms = state.services.firmalar.list(&caller, filter.status, filter.limit, filter.offset).await?;
    Ok(ok(firms))
}

async fn get(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.firmalar.get(&caller, path.into_inner()).await?))
}

async fn update(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<UpdateFirmaRequest>,
) -> ServiceResult<HttpResponse> {
    let firma = state.services.firmalar.update_profile(&caller, path.into_inner(), body.into_inner()).await?;
    Ok(ok(firma))
}

async fn delete(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.firmalar.delete(&caller, path.into_inner()).await?))
}

async fn approve(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.firmalar.approve(&caller, path.into_inner()).await?))
}

async fn deactivate(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<ReasonRequest>,
) -> ServiceResult<HttpResponse> {
    let firma = state.services.firmalar.deactivate(&caller, path.into_inner(), body.into_inner().reason).await?;
    Ok(ok(firma))
}

async fn activate(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.firmalar.activate(&caller, path.into_inner()).await?))
}

async fn catalog(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    page: web::Query<Page>,
) -> ServiceResult<HttpResponse> {
    let materials = state
        .services
        .malzemeler
        .catalog(&caller, path.into_inner(), page.limit, page.offset)
        .await?;
    Ok(ok(materials))
}
