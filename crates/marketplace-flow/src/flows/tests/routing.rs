use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::flows::domain::FlowKind;
use crate::flows::launcher::FlowEntry;
use crate::flows::router::{flow_router, next_handler, view_handler};
use crate::flows::service::FlowSessionService;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn open_route_returns_created_prelude() {
    let (service, _) = build_service();

    let response = flow_router(service)
        .oneshot(json_request(
            Method::POST,
            "/api/v1/flows",
            json!({ "kind": "business_card" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["phase"], json!("prelude"));
    assert_eq!(payload["prelude"]["state"]["state"], json!("selecting"));
    assert_eq!(
        payload["prelude"]["options"]
            .as_array()
            .map(|options| options.len()),
        Some(8)
    );
}

#[tokio::test]
async fn category_and_confirm_routes_start_the_steps() {
    let (service, _) = build_service();
    let router = flow_router(service.clone());
    let id = service
        .open_create(FlowKind::BusinessCard)
        .expect("open")
        .session_id;

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/flows/{id}/category"),
            json!({ "category": "hospitality" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["prelude"]["state"],
        json!({ "state": "confirming", "category": "hospitality" })
    );

    let response = router
        .oneshot(empty_request(
            Method::POST,
            &format!("/api/v1/flows/{id}/confirm"),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["phase"], json!("steps"));
    assert_eq!(payload["flow"]["current_step"], json!(1));
    assert_eq!(payload["flow"]["data"]["category"], json!("hospitality"));
}

#[tokio::test]
async fn blocked_next_is_unprocessable_with_the_report() {
    let (service, _) = build_service();
    let id = service
        .open_create(FlowKind::ProfileCard)
        .expect("open")
        .session_id;

    let response = next_handler::<MemoryGateway>(State(service), Path(id.0.clone())).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["validation"]["step"], json!(1));
    assert_eq!(
        payload["validation"]["issues"][0]["field"],
        json!("yearsOfExperience")
    );
}

#[tokio::test]
async fn data_and_jump_routes_update_the_session() {
    let (service, _) = build_service();
    let router = flow_router(service.clone());
    let id = service
        .open_create(FlowKind::ProfileCard)
        .expect("open")
        .session_id;

    let response = router
        .clone()
        .oneshot(json_request(
            Method::PATCH,
            &format!("/api/v1/flows/{id}/data"),
            json!({ "fields": { "yearsOfExperience": 4, "dealsCompleted": 2 } }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["flow"]["navigation"]["can_continue"], json!(true));

    let response = router
        .oneshot(json_request(
            Method::POST,
            &format!("/api/v1/flows/{id}/jump"),
            json!({ "step": 3 }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn submit_failure_maps_to_bad_gateway() {
    let gateway = Arc::new(MemoryGateway::failing(1));
    let service = Arc::new(FlowSessionService::new(gateway, 4));
    let id = service
        .open(FlowEntry::edit(existing_business()))
        .expect("open edit")
        .session_id;
    service.next(&id).await.expect("to info");
    service.next(&id).await.expect("to review");

    let response = flow_router(service)
        .oneshot(empty_request(
            Method::POST,
            &format!("/api/v1/flows/{id}/submit"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["retryable"], json!(true));
}

#[tokio::test]
async fn unknown_sessions_and_entities_are_not_found() {
    let (service, _) = build_service();

    let response =
        view_handler::<MemoryGateway>(State(service.clone()), Path("flow-000000".to_string()))
            .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = flow_router(service)
        .oneshot(json_request(
            Method::POST,
            "/api/v1/flows",
            json!({ "kind": "business_card", "entity_id": "biz-404" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn close_route_returns_no_content() {
    let (service, _) = build_service();
    let id = service
        .open_create(FlowKind::Listing)
        .expect("open")
        .session_id;

    let response = flow_router(service.clone())
        .oneshot(empty_request(Method::DELETE, &format!("/api/v1/flows/{id}")))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(service.open_sessions().expect("count"), 0);
}

#[tokio::test]
async fn capacity_maps_to_too_many_requests() {
    let service = Arc::new(FlowSessionService::new(
        Arc::new(MemoryGateway::default()),
        1,
    ));
    service.open_create(FlowKind::Listing).expect("first");

    let response = flow_router(service)
        .oneshot(json_request(
            Method::POST,
            "/api/v1/flows",
            json!({ "kind": "listing" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}
