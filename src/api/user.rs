use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::user::Role;
use crate::error::ServiceResult;
use crate::services::user::{CreateUserRequest, UpdateUserRequest};
use super::{created, ok, AppState, Authenticated};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/me", web::get().to(me)).service(
        web::scope("/users")
            .route("", web::post().to(create))
            .route("", web::get().to(list))
            .route("/{id}", web::get().to(get))
            .route("/{id}", web::put().to(update_profile))
            .route("/{id}", web::delete().to(delete))
            .route("/{id}/role", web::put().to(change_role))
            .route("/{id}/disable", web::post().to(disable))
            .route("/{id}/enable", web::post().to(enable)),
    );
}

#[derive(Debug, Deserialize)]
struct UserFilter {
    firma_id: Option<Uuid>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RoleRequest {
    role: Role,
}

async fn me(state: web::Data<AppState>, caller: Authenticated) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.users.me(&caller).await?))
}

async fn create(
    state: web::Data<AppState>,
    caller: Authenticated,
    body: web::Json<CreateUserRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(created(state.services.users.create(&caller, body.into_inner()).await?))
}

async fn list(
    state: web::Data<AppState>,
    caller: Authenticated,
    filter: web::Query<UserFilter>,
) -> ServiceResult<HttpResponse> {
    let filter = filter.into_inner();
    let users = state.services.users.list(&caller, filter.firma_id, filter.limit, filter.offset).await?;
    Ok(ok(users))
}

async fn get(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.users.get(&caller, path.into_inner()).await?))
}

async fn update_profile(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<UpdateUserRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.users.update_profile(&caller, path.into_inner(), body.into_inner()).await?))
}

async fn change_role(
    state: web::Data<AppState>,
    caller: Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<RoleRequest>,
) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.users.change_role(&caller, path.into_inner(), body.role).await?))
}

async fn disable(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.users.disable(&caller, path.into_inner()).await?))
}

async fn enable(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.users.enable(&caller, path.into_inner()).await?))
}

async fn delete(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    Ok(ok(state.services.users.delete(&caller, path.into_inner()).await?))
}
