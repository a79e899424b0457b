use crate::cli::ServeArgs;
use crate::infra::{build_service, AppState, InMemoryAliasStore, InMemoryCriteriaStore};
use crate::routes::with_ingest_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use runlist_core::config::AppConfig;
use runlist_core::error::AppError;
use runlist_core::telemetry;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(build_service(
        &config.registry,
        InMemoryAliasStore::default(),
        InMemoryCriteriaStore::default(),
    )?);

    let app = with_ingest_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "runlist ingestion service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
