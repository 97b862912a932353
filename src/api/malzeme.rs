use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::malzeme::MalzemeStatus;
use crate::error::ServiceResult;
use crate::services::malzeme::{ChangePriceRequest, CreateMalzemeRequest, UpdateMalzemeRequest};
use super::{created, ok, AppState, Authenticated};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/malzemeler")
            .route("", web::post().to(create))
            .route("", web::get().to(list_own))
            .route("/{id}", web::get().to(get))
            .route("/{id}", web::put().to(update))
            .route("/{id}", web::delete().to(delete))
            .route("/{id}/price", web::put().to(change_price))
            .route("/{id}/deactivate", web::post().to(deactivate))
            .route("/{id}/activate", web::post().to(activate)),
    );
}

#[derive(Debug, Deserialize)]
struct MalzemeFilter {
    status: Option<MalzemeStatus>,
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn create(
    state: web::Data<AppState>,
    caller: Authenticated,
    body: web::Json<CreateMalzemeRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(created(state.services.malzemeler.create(&caller, body.into_inner()).await?))
}

/// Materials of the caller's own firm, any status.
async fn list_own(
    state: web::Data<AppState>,
    caller: Authenticated,
    filter: web::Query<MalzemeFilter>,
) -> ServiceResult<HttpResponse> {
    let filter = filter.into_inner();
    let materials = state
        .services
        .malzemeler
        .list_own(&caller, filter.status, filter.limit, filter.offset)
        .await?;
    Ok(ok(materials))
}

async fn get(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.malzemeler.get(&caller, path.into_inner()).await?))
}

async fn update(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<UpdateMalzemeRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.malzemeler.update(&caller, path.into_inner(), body.into_inner()).await?))
}

async fn change_price(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<ChangePriceRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.malzemeler.change_price(&caller, path.into_inner(), body.into_inner()).await?))
}

async fn deactivate(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.malzemeler.deactivate(&caller, path.into_inner()).await?))
}

async fn activate(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.malzemeler.activate(&caller, path.into_inner()).await?))
}

async fn delete(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.malzemeler.delete(&caller, path.into_inner()).await?))
}
