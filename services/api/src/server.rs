use crate::cli::ServeArgs;
use crate::infra::{AppState, ListingStore, OfflineDistanceProvider, SettingsFile, SpielFile};
use crate::routes::with_listing_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use rent_ranker::config::AppConfig;
use rent_ranker::error::AppError;
use rent_ranker::listings::{ListingService, ListingServiceError, WeightConfigHolder};
use rent_ranker::telemetry;
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

    let repository = match &config.storage.listings_file {
        Some(path) => ListingStore::open(path).map_err(ListingServiceError::from)?,
        None => ListingStore::in_memory(),
    };
    let settings = config
        .storage
        .settings_file
        .clone()
        .map_or_else(SettingsFile::in_memory, SettingsFile::at);
    let weights = WeightConfigHolder::load(Arc::new(settings), config.scoring.default_weights());
    let mut listing_service = ListingService::new(
        Arc::new(repository),
        weights,
        Arc::new(OfflineDistanceProvider),
    );
    if let Some(path) = &config.storage.spiel_file {
        listing_service = listing_service.with_spiel_store(Arc::new(SpielFile::at(path)));
    }
    let listing_service = Arc::new(listing_service);

    let app = with_listing_routes(listing_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        persisted = config.storage.listings_file.is_some(),
        "rent ranker listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
