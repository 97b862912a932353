use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::ihale::IhaleStatus;
use crate::error::ServiceResult;
use crate::services::ihale::{
    AcceptBidRequest, CreateIhaleRequest, IhaleScope, OrderAwardRequest, SubmitBidRequest, UpdateIhaleRequest,
};
use super::{created, ok, AppState, Authenticated, ReasonRequest};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/ihaleler")
            .route("", web::post().to(create))
            .route("", web::get().to(list))
            .route("/{id}", web::get().to(get))
            .route("/{id}", web::put().to(update_draft))
            .route("/{id}", web::delete().to(delete))
            .route("/{id}/publish", web::post().to(publish))
            .route("/{id}/close", web::post().to(close))
            .route("/{id}/cancel", web::post().to(cancel))
            .route("/{id}/siparis", web::post().to(order_award))
            .route("/{id}/teklifler", web::post().to(submit_bid))
            .route("/{id}/teklifler/{teklif_id}/withdraw", web::post().to(withdraw_bid))
            .route("/{id}/teklifler/{teklif_id}/accept", web::post().to(accept_bid))
            .route("/{id}/teklifler/{teklif_id}/reject", web::post().to(reject_bid)),
    );
}

#[derive(Debug, Deserialize)]
struct IhaleFilter {
    #[serde(default)]
    scope: IhaleScope,
    status: Option<IhaleStatus>,
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn create(
    state: web::Data<AppState>,
    caller: Authenticated,
    body: web::Json<CreateIhaleRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(created(state.services.ihaleler.create(&caller, body.into_inner()).await?))
}

async fn list(
    state: web::Data<AppState>,
    caller: Authenticated,
    filter: web::Query<IhaleFilter>,
) -> ServiceResult<HttpResponse> {
    let filter = filter.into_inner();
    let tenders = state
        .services
        .ihaleler
        .list(&caller, filter.scope, filter.status, filter.limit, filter.offset)
        .await?;
    Ok(ok(tenders))
}

async fn get(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.ihaleler.get(&caller, path.into_inner()).await?))
}

async fn update_draft(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<UpdateIhaleRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.ihaleler.update_draft(&caller, path.into_inner(), body.into_inner()).await?))
}

async fn delete(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.ihaleler.delete(&caller, path.into_inner()).await?))
}

async fn publish(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.ihaleler.publish(&caller, path.into_inner()).await?))
}

async fn close(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.ihaleler.close(&caller, path.into_inner()).await?))
}

async fn cancel(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<ReasonRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.ihaleler.cancel(&caller, path.into_inner(), body.into_inner().reason).await?))
}

async fn submit_bid(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<SubmitBidRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(created(state.services.ihaleler.submit_bid(&caller, path.into_inner(), body.into_inner()).await?))
}

async fn withdraw_bid(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<(Uuid, Uuid)>,
) -> ServiceResult<HttpResponse> {
    let (id, teklif_id) = path.into_inner();
    Ok(ok(state.services.ihaleler.withdraw_bid(&caller, id, teklif_id).await?))
}

/// Award a bid. An empty body only awards; `create_order` also places the order.
async fn accept_bid(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<(Uuid, Uuid)>,
    body: Option<web::Json<AcceptBidRequest>>,
) -> ServiceResult<HttpResponse> {
    let (id, teklif_id) = path.into_inner();
    let request = body.map(web::Json::into_inner).unwrap_or_default();
    Ok(ok(state.services.ihaleler.accept_bid(&caller, id, teklif_id, request).await?))
}

/// Place the order for an already awarded bid.
async fn order_award(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: Option<web::Json<OrderAwardRequest>>,
) -> ServiceResult<HttpResponse> {
    let request = body.map(web::Json::into_inner).unwrap_or_default();
    Ok(created(state.services.ihaleler.order_award(&caller, path.into_inner(), request).await?))
}

async fn reject_bid(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<ReasonRequest>,
) -> ServiceResult<HttpResponse> {
    let (id, teklif_id) = path.into_inner();
    let result = state
        .services
        .ihaleler
        .reject_bid(&caller, id, teklif_id, body.into_inner().reason)
        .await?;
    Ok(ok(result))
}
