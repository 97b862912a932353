use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::actors::{GetImportJob, SubmitImport};
use crate::domain::siparis::{SiparisKalemi, SiparisStatus};
use crate::error::{ApiResponse, ServiceResult};
use crate::services::siparis::{CreateSiparisRequest, ImportRow, OrderSide, ShipRequest};
use super::{created, ok, AppState, Authenticated, ReasonRequest};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/siparisler")
            .route("", web::post().to(create))
            .route("", web::get().to(list))
            .route("/import", web::post().to(submit_import))
            .route("/{id}", web::get().to(get))
            .route("/{id}", web::delete().to(delete))
            .route("/{id}/items", web::put().to(update_items))
            .route("/{id}/confirm", web::post().to(confirm))
            .route("/{id}/reject", web::post().to(reject))
            .route("/{id}/ship", web::post().to(ship))
            .route("/{id}/deliver", web::post().to(deliver))
            .route("/{id}/cancel", web::post().to(cancel)),
    )
    .route("/imports/{id}", web::get().to(import_status));
}

#[derive(Debug, Deserialize)]
struct SiparisFilter {
    #[serde(default)]
    side: OrderSide,
    status: Option<SiparisStatus>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ItemsRequest {
    items: Vec<SiparisKalemi>,
}

#[derive(Debug, Deserialize)]
struct ImportRequest {
    rows: Vec<ImportRow>,
}

async fn create(
    state: web::Data<AppState>,
    caller: Authenticated,
    body: web::Json<CreateSiparisRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(created(state.services.siparisler.create(&caller, body.into_inner()).await?))
}

async fn list(
    state: web::Data<AppState>,
    caller: Authenticated,
    filter: web::Query<SiparisFilter>,
) -> ServiceResult<HttpResponse> {
    let filter = filter.into_inner();
    let orders = state
        .services
        .siparisler
        .list(&caller, filter.side, filter.status, filter.limit, filter.offset)
        .await?;
    Ok(ok(orders))
}

async fn get(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.siparisler.get(&caller, path.into_inner()).await?))
}

async fn delete(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.siparisler.delete(&caller, path.into_inner()).await?))
}

async fn update_items(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<ItemsRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.siparisler.update_items(&caller, path.into_inner(), body.into_inner().items).await?))
}

async fn confirm(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.siparisler.confirm(&caller, path.into_inner()).await?))
}

async fn reject(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<ReasonRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.siparisler.reject(&caller, path.into_inner(), body.into_inner().reason).await?))
}

async fn ship(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<ShipRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.siparisler.ship(&caller, path.into_inner(), body.into_inner()).await?))
}

async fn deliver(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.siparisler.deliver(&caller, path.into_inner()).await?))
}

async fn cancel(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<ReasonRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.siparisler.cancel(&caller, path.into_inner(), body.into_inner().reason).await?))
}

/// Queue a bulk import; rows are processed in the background.
async fn submit_import(
    state: web::Data<AppState>,
    caller: Authenticated,
    body: web::Json<ImportRequest>,
) -> ServiceResult<HttpResponse> {
    let message = SubmitImport { caller: caller.0, rows: body.into_inner().rows };
    let job = state.handles.import_worker.send(message).await??;
    Ok(HttpResponse::Accepted().json(ApiResponse::ok(job)))
}

async fn import_status(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
) -> ServiceResult<HttpResponse> {
    let message = GetImportJob { caller: caller.0, id: path.into_inner() };
    Ok(ok(state.handles.import_worker.send(message).await??))
}
