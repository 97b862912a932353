use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::actors::{GetDeadLetters, GetDlqStats, GetSystemHealth};
use crate::error::{ServiceError, ServiceResult};
use crate::store::DeadLetter;
use super::{ok, AppState, Authenticated};

const DEFAULT_DEAD_LETTER_LIMIT: i64 = 50;
const MAX_DEAD_LETTER_LIMIT: i64 = 500;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/admin/dead-letters", web::get().to(dead_letters));
}

/// `GET /health`: 200 while healthy or degraded, 503 when any component is down.
pub async fn health(state: web::Data<AppState>) -> ServiceResult<HttpResponse> {
    let health = state.handles.health_monitor.send(GetSystemHealth).await?;
    let response = if health.overall_status.is_unhealthy() {
        HttpResponse::ServiceUnavailable().json(health)
    } else {
        HttpResponse::Ok().json(health)
    };
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct DeadLetterQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct DeadLetterReport {
    total: i64,
    messages: Vec<DeadLetter>,
}

async fn dead_letters(
    state: web::Data<AppState>,
    caller: Authenticated,
    query: web::Query<DeadLetterQuery>,
) -> ServiceResult<HttpResponse> {
    if !caller.is_admin() {
        return Err(ServiceError::forbidden("Only admins can inspect the dead letter queue"));
    }
    let limit = query.limit.unwrap_or(DEFAULT_DEAD_LETTER_LIMIT).clamp(1, MAX_DEAD_LETTER_LIMIT);

    let stats = state.handles.dlq.send(GetDlqStats).await??;
    let messages = state.handles.dlq.send(GetDeadLetters { limit }).await??;
    Ok(ok(DeadLetterReport { total: stats.total_messages, messages }))
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};

    use crate::api::tests::{admin_user, app_data, body_json, state};
    use crate::api::{configure, USER_ID_HEADER};
    use crate::services::tests::approved_firma;

    #[actix_web::test]
    async fn test_health_and_metrics_endpoints() {
        let state = state().await;
        let (data, metrics) = app_data(&state);
        let app = test::init_service(App::new().app_data(data).app_data(metrics).configure(configure)).await;

        let response = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(response.status(), 200);
        let body = body_json(response).await;
        assert!(body["components"].is_object());

        let response = test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
        assert_eq!(response.status(), 200);
    }

    #[actix_web::test]
    async fn test_dead_letters_are_admin_only() {
        let state = state().await;
        let admin = admin_user(&state).await;
        let (_, firma_admin) = approved_firma(&state.services, "1616161616", "yonetici@enerji.com.tr").await;
        let (data, metrics) = app_data(&state);
        let app = test::init_service(App::new().app_data(data).app_data(metrics).configure(configure)).await;

        let request = test::TestRequest::get()
            .uri("/api/admin/dead-letters")
            .insert_header((USER_ID_HEADER, firma_admin.meta.id.to_string()))
            .to_request();
        assert_eq!(test::call_service(&app, request).await.status(), 403);

        let request = test::TestRequest::get()
            .uri("/api/admin/dead-letters?limit=10")
            .insert_header((USER_ID_HEADER, admin.meta.id.to_string()))
            .to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), 200);
        let body = body_json(response).await;
        assert_eq!(body["data"]["total"], 0);
        assert!(body["data"]["messages"].as_array().unwrap().is_empty());
    }
}
