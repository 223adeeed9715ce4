use crate::cli::ServeArgs;
use crate::infra::{build_scorer, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use land_engine::config::AppConfig;
use land_engine::error::AppError;
use land_engine::parcels::{ParcelService, SqliteParcelRepository};
use land_engine::telemetry;
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

    let scorer = Arc::new(build_scorer(&config)?);
    let repository = Arc::new(SqliteParcelRepository::open(
        &config.storage.database_path,
    )?);
    let parcel_service = Arc::new(ParcelService::new(repository));

    let app = with_service_routes(scorer, parcel_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        policy = ?config.empty_eligibility,
        "land engine ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
