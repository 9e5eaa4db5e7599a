use crate::cli::ServeArgs;
use crate::infra::{AppState, Engine};
use crate::routes::with_resolution_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use claim_resolution::config::AppConfig;
use claim_resolution::error::AppError;
use claim_resolution::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let engine = Engine::from_config(&config)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        store: engine.store.clone(),
    };

    let app = with_resolution_routes(&engine)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "claim resolution engine ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(readiness_flag))
        .await?;

    // Invitations and confirmations run detached; let them finish before exit.
    engine.notifier.drain().await;
    info!("notification tasks drained; shutting down");
    Ok(())
}

async fn shutdown_signal(readiness: Arc<AtomicBool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    readiness.store(false, Ordering::Release);
    info!("shutdown signal received");
}
