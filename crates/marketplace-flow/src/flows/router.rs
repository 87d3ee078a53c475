use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{BusinessCategory, EntityId, FieldMap, FlowKind, StepId};
use super::error::FlowError;
use super::gateway::{GatewayError, PersistenceGateway};
use super::service::{FlowServiceError, FlowSessionService, SessionId};

#[derive(Debug, Deserialize)]
pub(crate) struct OpenFlowRequest {
    pub(crate) kind: FlowKind,
    #[serde(default)]
    pub(crate) entity_id: Option<EntityId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryRequest {
    pub(crate) category: BusinessCategory,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StepDataRequest {
    pub(crate) fields: FieldMap,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JumpRequest {
    pub(crate) step: StepId,
}

type SharedService<G> = Arc<FlowSessionService<G>>;

/// Router exposing flow sessions over HTTP.
pub fn flow_router<G>(service: Arc<FlowSessionService<G>>) -> Router
where
    G: PersistenceGateway + 'static,
{
    Router::new()
        .route("/api/v1/flows", post(open_handler::<G>))
        .route(
            "/api/v1/flows/:session_id",
            get(view_handler::<G>).delete(close_handler::<G>),
        )
        .route(
            "/api/v1/flows/:session_id/category",
            post(category_handler::<G>),
        )
        .route(
            "/api/v1/flows/:session_id/confirm",
            post(confirm_handler::<G>),
        )
        .route(
            "/api/v1/flows/:session_id/reselect",
            post(reselect_handler::<G>),
        )
        .route("/api/v1/flows/:session_id/data", patch(data_handler::<G>))
        .route("/api/v1/flows/:session_id/next", post(next_handler::<G>))
        .route(
            "/api/v1/flows/:session_id/previous",
            post(previous_handler::<G>),
        )
        .route("/api/v1/flows/:session_id/jump", post(jump_handler::<G>))
        .route("/api/v1/flows/:session_id/submit", post(submit_handler::<G>))
        .with_state(service)
}

pub(crate) async fn open_handler<G>(
    State(service): State<SharedService<G>>,
    Json(request): Json<OpenFlowRequest>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    let result = match request.entity_id {
        Some(entity_id) => service.open_edit(request.kind, &entity_id).await,
        None => service.open_create(request.kind),
    };
    match result {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn view_handler<G>(
    State(service): State<SharedService<G>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    respond(service.view(&SessionId(session_id)))
}

pub(crate) async fn category_handler<G>(
    State(service): State<SharedService<G>>,
    Path(session_id): Path<String>,
    Json(request): Json<CategoryRequest>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    respond(service.select_category(&SessionId(session_id), request.category))
}

pub(crate) async fn confirm_handler<G>(
    State(service): State<SharedService<G>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    respond(service.get_started(&SessionId(session_id)))
}

pub(crate) async fn reselect_handler<G>(
    State(service): State<SharedService<G>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    respond(service.reselect(&SessionId(session_id)))
}

pub(crate) async fn data_handler<G>(
    State(service): State<SharedService<G>>,
    Path(session_id): Path<String>,
    Json(request): Json<StepDataRequest>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    respond(service.update_data(&SessionId(session_id), request.fields))
}

pub(crate) async fn next_handler<G>(
    State(service): State<SharedService<G>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    respond(service.next(&SessionId(session_id)).await)
}

pub(crate) async fn previous_handler<G>(
    State(service): State<SharedService<G>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    respond(service.previous(&SessionId(session_id)))
}

pub(crate) async fn jump_handler<G>(
    State(service): State<SharedService<G>>,
    Path(session_id): Path<String>,
    Json(request): Json<JumpRequest>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    respond(service.jump(&SessionId(session_id), request.step))
}

pub(crate) async fn submit_handler<G>(
    State(service): State<SharedService<G>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    respond(service.submit(&SessionId(session_id)).await)
}

pub(crate) async fn close_handler<G>(
    State(service): State<SharedService<G>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: PersistenceGateway + 'static,
{
    match service.close(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

fn respond<T: serde::Serialize>(result: Result<T, FlowServiceError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_response(err: FlowServiceError) -> Response {
    match err {
        FlowServiceError::Validation(report) | FlowServiceError::Flow(FlowError::Blocked(report)) => {
            let payload = json!({
                "error": "step requirements not met",
                "validation": report,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response()
        }
        FlowServiceError::NotFound(_)
        | FlowServiceError::Gateway(GatewayError::NotFound(_)) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        FlowServiceError::Flow(FlowError::Persistence(_)) | FlowServiceError::Gateway(_) => {
            let payload = json!({ "error": err.to_string(), "retryable": true });
            (StatusCode::BAD_GATEWAY, Json(payload)).into_response()
        }
        FlowServiceError::CapacityReached { .. } => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::TOO_MANY_REQUESTS, Json(payload)).into_response()
        }
        FlowServiceError::Unavailable(_) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
        FlowServiceError::WrongPhase { .. } | FlowServiceError::Flow(_) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
    }
}
