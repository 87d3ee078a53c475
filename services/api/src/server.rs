use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryDraftStore, InMemoryEntityStore};
use crate::routes::with_flow_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use marketplace_flow::config::AppConfig;
use marketplace_flow::error::AppError;
use marketplace_flow::flows::{DraftMirror, FlowSessionService, MirroredGateway};
use marketplace_flow::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(limit) = args.max_open_sessions.take().filter(|limit| *limit > 0) {
        config.flows.max_open_sessions = limit;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let entities = Arc::new(InMemoryEntityStore::default());
    let mirror = config
        .flows
        .draft_mirror
        .then(|| DraftMirror::new(Arc::new(InMemoryDraftStore::default())));
    let gateway = Arc::new(MirroredGateway::new(entities, mirror));
    let flow_service = Arc::new(FlowSessionService::new(
        gateway,
        config.flows.max_open_sessions,
    ));

    let app = with_flow_routes(flow_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        draft_mirror = config.flows.draft_mirror,
        max_open_sessions = config.flows.max_open_sessions,
        "marketplace flow service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
