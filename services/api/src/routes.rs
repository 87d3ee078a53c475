use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use marketplace_flow::flows::{flow_router, FlowKind, FlowSessionService, PersistenceGateway};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub(crate) struct FlowKindSummary {
    pub(crate) kind: FlowKind,
    pub(crate) label: &'static str,
    pub(crate) uses_prelude: bool,
}

pub(crate) fn with_flow_routes<G>(service: Arc<FlowSessionService<G>>) -> axum::Router
where
    G: PersistenceGateway + 'static,
{
    flow_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/flow-kinds", axum::routing::get(flow_kinds_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn flow_kinds_endpoint() -> Json<Vec<FlowKindSummary>> {
    Json(
        FlowKind::ordered()
            .into_iter()
            .map(|kind| FlowKindSummary {
                kind,
                label: kind.label(),
                uses_prelude: kind.uses_prelude(),
            })
            .collect(),
    )
}
