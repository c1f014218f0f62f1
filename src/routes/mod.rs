// HTTP + WebSocket routes over the published fleet state

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::telemetry::TelemetrySource;
use crate::worker::FleetHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) fleet: FleetHandle,
    pub(crate) source: Arc<dyn TelemetrySource>,
    pub(crate) ws_fleet_connections: Arc<AtomicUsize>,
    pub(crate) config: Arc<AppConfig>,
}

pub fn app(
    fleet: FleetHandle,
    source: Arc<dyn TelemetrySource>,
    ws_fleet_connections: Arc<AtomicUsize>,
    config: AppConfig,
) -> Router {
    let state = AppState {
        fleet,
        source,
        ws_fleet_connections,
        config: Arc::new(config),
    };
    Router::new()
        .route("/", get(|| async { "fleetwatch: fleet telemetry aggregator" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/state", get(http::state_handler)) // GET /api/state
        .route("/api/vehicles", get(http::vehicles_handler)) // GET /api/vehicles
        .route("/api/vehicles/{id}", get(http::vehicle_detail_handler)) // GET /api/vehicles/{id}
        .route("/api/anomalies", get(http::anomalies_handler)) // GET /api/anomalies
        .route(
            "/api/anomalies/{id}/resolve",
            post(http::resolve_anomaly_handler),
        ) // POST /api/anomalies/{id}/resolve
        .route("/api/selection", put(http::selection_handler)) // PUT /api/selection
        .route("/api/chat", put(http::chat_handler)) // PUT /api/chat
        .route("/api/eta", get(http::eta_handler)) // GET /api/eta
        .route("/api/spike", post(http::spike_handler)) // POST /api/spike
        .route("/ws/fleet", get(ws::ws_fleet)) // WS /ws/fleet
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
