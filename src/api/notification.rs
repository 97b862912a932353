use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ServiceResult;
use super::{ok, AppState, Authenticated};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .route("", web::get().to(list))
            .route("/unread-count", web::get().to(unread_count))
            .route("/read-all", web::post().to(mark_all_read))
            .route("/{id}/read", web::post().to(mark_read)),
    );
}

#[derive(Debug, Deserialize)]
struct NotificationFilter {
    #[serde(default)]
    unread_only: bool,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Serialize)]
struct Count {
    count: u64,
}

async fn list(
    state: web::Data<AppState>,
    caller: Authenticated,
    filter: web::Query<NotificationFilter>,
) -> ServiceResult<HttpResponse> {
    let filter = filter.into_inner();
    let notifications = state
        .services
        .notifications
        .list(&caller, filter.unread_only, filter.limit, filter.offset)
        .await?;
    Ok(ok(notifications))
}

async fn unread_count(state: web::Data<AppState>, caller: Authenticated) -> ServiceResult<HttpResponse> {
    let count = state.services.notifications.unread_count(&caller).await?;
    Ok(ok(Count { count: count.max(0) as u64 }))
}

async fn mark_read(state: web::Data<AppState>, caller: Authenticated, path: web::Path<Uuid>) -> ServiceResult<HttpResponse> {
    state.services.notifications.mark_read(&caller, path.into_inner()).await?;
    Ok(ok(()))
}

async fn mark_all_read(state: web::Data<AppState>, caller: Authenticated) -> ServiceResult<HttpResponse> {
    let count = state.services.notifications.mark_all_read(&caller).await?;
    Ok(ok(Count { count }))
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use serde_json::json;

    use crate::actors::DrainOutbox;
    use crate::api::tests::{app_data, body_json, state};
    use crate::api::{configure, USER_ID_HEADER};
    use crate::domain::firma::FirmaType;
    use crate::services::tests::approved_firma_of_type;

    #[actix_web::test]
    async fn test_supplier_is_notified_of_new_order_and_marks_it_read() {
        let state = state().await;
        let (_, buyer) =
            approved_firma_of_type(&state.services, "1414141414", "alim@otel.com.tr", FirmaType::Customer).await;
        let (supplier, seller) =
            approved_firma_of_type(&state.services, "1515151515", "satis@tekstil.com.tr", FirmaType::Supplier).await;
        let (data, metrics) = app_data(&state);
        let app = test::init_service(App::new().app_data(data).app_data(metrics).configure(configure)).await;

        // Clear the approval notice first.
        state.handles.outbox_relay.send(DrainOutbox).await.unwrap().unwrap();
        let request = test::TestRequest::post()
            .uri("/api/notifications/read-all")
            .insert_header((USER_ID_HEADER, seller.meta.id.to_string()))
            .to_request();
        assert_eq!(body_json(test::call_service(&app, request).await).await["data"]["count"], 1);

        let request = test::TestRequest::post()
            .uri("/api/siparisler")
            .insert_header((USER_ID_HEADER, buyer.meta.id.to_string()))
            .set_json(json!({
                "supplier_firma_id": supplier.meta.id,
                "items": [{ "malzeme_id": null, "description": "Havlu", "quantity": "300", "unit": "Piece", "unit_price": "85" }],
                "delivery_address": null,
                "requested_delivery_date": null,
                "note": null
            }))
            .to_request();
        assert_eq!(test::call_service(&app, request).await.status(), 201);

        state.handles.outbox_relay.send(DrainOutbox).await.unwrap().unwrap();

        let request = test::TestRequest::get()
            .uri("/api/notifications/unread-count")
            .insert_header((USER_ID_HEADER, seller.meta.id.to_string()))
            .to_request();
        assert_eq!(body_json(test::call_service(&app, request).await).await["data"]["count"], 1);

        let request = test::TestRequest::get()
            .uri("/api/notifications?unread_only=true")
            .insert_header((USER_ID_HEADER, seller.meta.id.to_string()))
            .to_request();
        let body = body_json(test::call_service(&app, request).await).await;
        let notification = &body["data"][0];
        assert_eq!(notification["aggregate_type"], "Siparis");
        let id = notification["id"].as_str().unwrap().to_string();

        // Another firm cannot touch it.
        let request = test::TestRequest::post()
            .uri(&format!("/api/notifications/{}/read", id))
            .insert_header((USER_ID_HEADER, buyer.meta.id.to_string()))
            .to_request();
        assert_eq!(test::call_service(&app, request).await.status(), 404);

        let request = test::TestRequest::post()
            .uri(&format!("/api/notifications/{}/read", id))
            .insert_header((USER_ID_HEADER, seller.meta.id.to_string()))
            .to_request();
        assert_eq!(test::call_service(&app, request).await.status(), 200);

        let request = test::TestRequest::get()
            .uri("/api/notifications/unread-count")
            .insert_header((USER_ID_HEADER, seller.meta.id.to_string()))
            .to_request();
        assert_eq!(body_json(test::call_service(&app, request).await).await["data"]["count"], 0);
    }
}
