// JSON handlers: version, state reads, operator commands, synthetic events

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::models::{AnomalyEntry, VehicleSnapshot};

const DEFAULT_SYNTHETIC_EVENT: &str = "emission_spike";

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/state: the full latest published state.
pub(super) async fn state_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.fleet.state())
}

/// GET /api/vehicles: current snapshot set.
pub(super) async fn vehicles_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.fleet.state().vehicles.clone())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VehicleDetail {
    vehicle_id: String,
    driver_name: String,
    /// `None` when the vehicle has stopped reporting but still has history.
    current: Option<VehicleSnapshot>,
    history: Vec<Arc<VehicleSnapshot>>,
    anomalies: Vec<AnomalyEntry>,
}

/// GET /api/vehicles/{id}: one vehicle's latest snapshot, history and open anomalies.
pub(super) async fn vehicle_detail_handler(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Response {
    let fleet = state.fleet.state();
    let current = fleet.vehicle(&vehicle_id).cloned();
    let history: Vec<Arc<VehicleSnapshot>> = fleet
        .history_of(&vehicle_id)
        .map(|h| h.iter().cloned().collect())
        .unwrap_or_default();
    if current.is_none() && history.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "vehicle not found", "vehicleId": vehicle_id })),
        )
            .into_response();
    }
    let anomalies = fleet.anomalies_for(&vehicle_id).cloned().collect();
    Json(VehicleDetail {
        driver_name: state.config.driver_name(&vehicle_id).to_string(),
        vehicle_id,
        current,
        history,
        anomalies,
    })
    .into_response()
}

/// GET /api/anomalies: active (most recent first) and resolved lists.
pub(super) async fn anomalies_handler(State(state): State<AppState>) -> impl IntoResponse {
    let fleet = state.fleet.state();
    Json(serde_json::json!({
        "active": fleet.anomalies,
        "resolved": fleet.resolved_anomalies,
    }))
}

/// POST /api/anomalies/{id}/resolve: queued behind the current tick; unknown ids are a no-op.
pub(super) async fn resolve_anomaly_handler(
    State(state): State<AppState>,
    Path(anomaly_id): Path<String>,
) -> Response {
    command_response(state.fleet.resolve(anomaly_id).await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SelectionRequest {
    #[serde(default)]
    vehicle_id: Option<String>,
}

/// PUT /api/selection: set or clear the focused vehicle. Not validated against the fleet.
pub(super) async fn selection_handler(
    State(state): State<AppState>,
    Json(body): Json<SelectionRequest>,
) -> Response {
    command_response(state.fleet.select(body.vehicle_id).await)
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatRequest {
    open: bool,
}

/// PUT /api/chat: open or close the chat side panel.
pub(super) async fn chat_handler(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Response {
    command_response(state.fleet.set_chat_open(body.open).await)
}

/// GET /api/eta: ETA board from the last fleet-intel poll.
pub(super) async fn eta_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.fleet.state().eta_vehicles.clone())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SpikeRequest {
    vehicle_id: String,
    #[serde(default)]
    kind: Option<String>,
}

/// POST /api/spike: forward a demo event to the telemetry source. The result is only an
/// acknowledgement for the UI; the aggregator sees the effect on a later poll, if at all.
pub(super) async fn spike_handler(
    State(state): State<AppState>,
    Json(body): Json<SpikeRequest>,
) -> Response {
    let kind = body.kind.as_deref().unwrap_or(DEFAULT_SYNTHETIC_EVENT);
    match state
        .source
        .submit_synthetic_event(&body.vehicle_id, kind)
        .await
    {
        Ok(()) => Json(serde_json::json!({
            "status": "ok",
            "vehicleId": body.vehicle_id,
            "kind": kind,
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(
                error = %e,
                operation = "submit_synthetic_event",
                vehicle_id = %body.vehicle_id,
                "synthetic event rejected"
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({ "status": "error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

fn command_response(result: anyhow::Result<()>) -> Response {
    match result {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
