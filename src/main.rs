use anyhow::Result;
use fleetwatch::*;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;

    let source: Arc<dyn telemetry::TelemetrySource> = Arc::new(
        telemetry::HttpTelemetrySource::new(app_config.http_telemetry())?,
    );
    let aggregator =
        aggregator::FleetAggregator::new(app_config.limits(), app_config.thresholds());
    let ws_fleet_connections = Arc::new(AtomicUsize::new(0));

    let poller = worker::start_polling(
        source.clone(),
        aggregator,
        ws_fleet_connections.clone(),
        worker::WorkerConfig {
            poll_interval_ms: app_config.aggregator.poll_interval_ms,
            request_timeout_ms: app_config.telemetry.request_timeout_ms,
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
            command_capacity: app_config.aggregator.command_capacity,
        },
    );
    tracing::info!(
        telemetry = %app_config.telemetry.base_url,
        poll_interval_ms = app_config.aggregator.poll_interval_ms,
        "Polling fleet telemetry"
    );

    let app = routes::app(
        poller.handle(),
        source,
        ws_fleet_connections,
        app_config.clone(),
    );
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
            poller.stop().await;
        }
    }

    Ok(())
}
